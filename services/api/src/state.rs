//! Application state shared across handlers

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    jwt::JwtService,
    realtime::presence::ConnectionRegistry,
    repositories::{
        FollowRepository, LoanRepository, MessageRepository, PostRepository, SavingsRepository,
        UserRepository,
    },
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_service: JwtService,
    pub registry: Arc<dyn ConnectionRegistry>,
    pub user_repository: UserRepository,
    pub follow_repository: FollowRepository,
    pub post_repository: PostRepository,
    pub message_repository: MessageRepository,
    pub loan_repository: LoanRepository,
    pub savings_repository: SavingsRepository,
}
