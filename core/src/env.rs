// Ride Tracker
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Typed access to the `<PREFIX>_<NAME>` environment variables that configure the service.

use std::env;
use std::net::IpAddr;

/// Types that can be read from an environment variable.
pub trait EnvValue: Sized {
    /// Converts the raw contents of a variable, or explains why they are not acceptable.
    fn parse_env(raw: String) -> Result<Self, String>;
}

impl EnvValue for String {
    fn parse_env(raw: String) -> Result<Self, String> {
        Ok(raw)
    }
}

/// Implements `EnvValue` for types that have a `FromStr`.
macro_rules! env_value_via_fromstr [
    ( $( $t:ty ),+ ) => {
        $(
            impl EnvValue for $t {
                fn parse_env(raw: String) -> Result<Self, String> {
                    raw.parse::<$t>()
                        .map_err(|e| format!("'{}' is not a {}: {}", raw, stringify!($t), e))
                }
            }
        )+
    }
];

env_value_via_fromstr!(u16, u32, IpAddr);

/// Reads `<prefix>_<suffix>` as a `T`.  An unset variable yields `None`.
pub fn get_optional_var<T: EnvValue>(prefix: &str, suffix: &str) -> Result<Option<T>, String> {
    let name = format!("{}_{}", prefix, suffix);
    let raw = match env::var(&name) {
        Ok(raw) => raw,
        Err(env::VarError::NotPresent) => return Ok(None),
        Err(env::VarError::NotUnicode(_)) => return Err(format!("{} is not valid UTF-8", name)),
    };
    T::parse_env(raw).map(Some).map_err(|e| format!("Bad value in {}: {}", name, e))
}

/// Reads `<prefix>_<suffix>` as a `T` and fails if it is unset.
pub fn get_required_var<T: EnvValue>(prefix: &str, suffix: &str) -> Result<T, String> {
    get_optional_var(prefix, suffix)?
        .ok_or_else(|| format!("Required environment variable {}_{} not present", prefix, suffix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use std::net::Ipv4Addr;
    use std::os::unix::ffi::OsStrExt;

    #[test]
    fn test_optional_unset() {
        temp_env::with_var_unset("RIDES_PORT", || {
            assert_eq!(None, get_optional_var::<u16>("RIDES", "PORT").unwrap());
        });
    }

    #[test]
    fn test_optional_typed_values() {
        temp_env::with_vars(
            [("RIDES_PORT", Some("8080")), ("RIDES_ADDRESS", Some("10.0.0.1"))],
            || {
                assert_eq!(Some(8080u16), get_optional_var::<u16>("RIDES", "PORT").unwrap());
                assert_eq!(
                    Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))),
                    get_optional_var::<IpAddr>("RIDES", "ADDRESS").unwrap()
                );
            },
        );
    }

    #[test]
    fn test_bad_number() {
        temp_env::with_var("RIDES_PORT", Some("70000"), || {
            let err = get_optional_var::<u16>("RIDES", "PORT").unwrap_err();
            assert!(err.starts_with("Bad value in RIDES_PORT: '70000' is not a u16"), "{}", err);
        });
    }

    #[test]
    fn test_bad_address() {
        temp_env::with_var("RIDES_ADDRESS", Some("10.0.0"), || {
            let err = get_required_var::<IpAddr>("RIDES", "ADDRESS").unwrap_err();
            assert!(err.starts_with("Bad value in RIDES_ADDRESS: '10.0.0' is not a IpAddr"), "{}", err);
        });
    }

    #[test]
    fn test_required_present() {
        temp_env::with_var("PGSQL_PROD_DATABASE", Some("rides"), || {
            assert_eq!("rides", get_required_var::<String>("PGSQL_PROD", "DATABASE").unwrap());
        });
    }

    #[test]
    fn test_required_missing() {
        temp_env::with_var_unset("PGSQL_PROD_HOST", || {
            assert_eq!(
                "Required environment variable PGSQL_PROD_HOST not present",
                get_required_var::<String>("PGSQL_PROD", "HOST").unwrap_err()
            );
        });
    }

    #[test]
    fn test_not_utf8() {
        temp_env::with_var("PGSQL_PROD_USERNAME", Some(OsStr::from_bytes(b"\xc3\x28")), || {
            assert_eq!(
                "PGSQL_PROD_USERNAME is not valid UTF-8",
                get_required_var::<String>("PGSQL_PROD", "USERNAME").unwrap_err()
            );
        });
    }
}
