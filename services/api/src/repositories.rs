//! Repositories for database operations

pub mod follow;
pub mod loan;
pub mod message;
pub mod post;
pub mod savings;
pub mod user;

pub use follow::FollowRepository;
pub use loan::LoanRepository;
pub use message::MessageRepository;
pub use post::PostRepository;
pub use savings::SavingsRepository;
pub use user::UserRepository;
