mod kernel;
mod middleware;
mod token;

pub use kernel::{
    AuthKernel, AuthRegistry, DEFAULT_LOAD_TIMEOUT, KernelState, RoleSource, StoreRoleSource,
};
pub use middleware::{
    Auth, AuthError, CurrentUser, MaybeAuth, RequireAdmin, RequireReader, RequireWriter,
};
pub use token::{IssuedToken, SecretHasher, issue_session_token, parse_session_token};
