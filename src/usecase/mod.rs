//! UseCase layer.
//!
//! One usecase per client-visible operation. Each locks the registry,
//! applies the domain transition, then persists and notifies outside the
//! lock.

pub mod error;
pub mod follow_question;
pub mod join_queue;
pub mod leave_queue;
pub mod notify;
pub mod operator;
pub mod push_back;
pub mod register_user;
pub mod room_access;

pub use error::AccessError;
pub use follow_question::FollowQuestionUseCase;
pub use join_queue::{JoinQueueUseCase, JoinRequest};
pub use leave_queue::LeaveQueueUseCase;
pub use notify::Dispatcher;
pub use operator::OperatorUseCase;
pub use push_back::PushBackUseCase;
pub use register_user::RegisterUserUseCase;
pub use room_access::RoomAccessUseCase;
