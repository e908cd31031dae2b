// implementation of the millrace channel.
//
// the basic architecture is as such:
//
// channel handles wrap around Rc<shared state>
//                                  |
//          /-----------------------/
//          v
//       shared state
//          |
//          |------ immutable configuration: the channel id, the admission
//          |       strategy and capacity window, and the turnloop::Spawner
//          |       used to schedule deferred scheduler passes
//          |
//          \------ a RefCell holding everything the operations mutate: the
//                  buffer of already-reduced values, the parked put and take
//                  queues, the closed and scheduled flags, and the reducer
//
// there is no locking and no atomics beyond the id mint: the whole structure
// is single-threaded and cooperative. put/take/close only register intent
// (plus at most one immediate admission); all matching of parked puts to
// parked takes happens in scheduler passes run on later turns of the host's
// task queue, which is what keeps cascades of puts and takes issued from
// inside callbacks from recursing.
//
// the organization of these modules is as such:
//
//      reduce<--------------core: the engine. panicky and inconvenient, but
//                           ^     it owns every state transition: admission
//                           |     through the strategy window and reducer,
//                           |     parking, and the snapshot-then-drain pass.
//                           |
//                           api: a wrapper around core that adapts it into an
//                                API that is convenient and defensive. the
//                                crate re-exports this API publically.
//
// there is also the error module, which contains the relevant error types,
// which is also re-exported publically.

pub(crate) mod api;
pub(crate) mod error;
pub(crate) mod reduce;

mod core;
