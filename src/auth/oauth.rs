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

use crate::auth::AuthProvider;
use crate::error::{Error, Result};

/// A pre-issued OAuth access token.
///
/// The token is presented as-is; refreshing it is the caller's business.
pub struct OAuthToken {
    token: String,
}

impl OAuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthToken")
            .field("token", &"<redacted>")
            .finish()
    }
}

impl AuthProvider for OAuthToken {
    fn get_auth_header(&self) -> Result<String> {
        if self.token.is_empty() {
            return Err(Error::credential("OAuth token is empty"));
        }
        Ok(format!("Bearer {}", self.token))
    }

    fn token_type(&self) -> &'static str {
        "OAUTH"
    }
}
