// Copyright (c) 2025 ADBC Drivers Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Authentication providers for the SQL API.
//!
//! Every request carries two headers produced by an [`AuthProvider`]:
//! `Authorization: Bearer <token>` and
//! `X-Snowflake-Authorization-Token-Type: <token type>`.
//!
//! - [`KeyPairAuthenticator`]: signed RS256 JWT from an RSA key pair
//! - [`OAuthToken`]: pre-issued OAuth access token

pub mod keypair;
pub mod oauth;

use crate::error::Result;

pub use keypair::{AuthToken, Credentials, KeyPairAuthenticator, PrivateKeySource};
pub use oauth::OAuthToken;

/// Header naming the kind of bearer token being presented.
pub const TOKEN_TYPE_HEADER: &str = "X-Snowflake-Authorization-Token-Type";

/// Source of the bearer credential attached to every request.
///
/// Implementations must not perform network I/O.
pub trait AuthProvider: Send + Sync + std::fmt::Debug {
    /// Value for the `Authorization` header (`Bearer <token>`).
    fn get_auth_header(&self) -> Result<String>;

    /// Value for the token-type header, e.g. `KEYPAIR_JWT`.
    fn token_type(&self) -> &'static str;
}
