//! Model checkpointing.
//!
//! ```rust,ignore
//! let mut checkpointer = Checkpointer::new(CheckpointerConfig::new("./checkpoints"))?;
//!
//! if checkpointer.should_save(episode) {
//!     checkpointer.save::<B, _, _>(agent.actor().model(), agent.critic().model(), episode, Some(avg))?;
//! }
//!
//! let (actor, critic) = checkpointer.load_best::<B, _, _>(actor_template, critic_template, &device)?;
//! ```

pub mod checkpointer;

pub use checkpointer::{CheckpointError, CheckpointInfo, Checkpointer, CheckpointerConfig};
