// Keywarden Strategies Module
// Protocol-specific credential rewriting

pub mod api_key;
pub mod aws_sigv4;
pub mod bearer;

pub use api_key::ApiKeyStrategy;
pub use aws_sigv4::AwsSigV4Strategy;
pub use bearer::BearerStrategy;
