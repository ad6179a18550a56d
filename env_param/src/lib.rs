//! Global parameters initialized from environment variables.
//!
//! An [EnvParam] pairs the name of an environment variable with a default value,
//! both given as static strings. The parameter is parsed on first access and
//! frozen afterwards: later changes to the environment are ignored.
//!
//! The intended use is for internal knobs that should be tunable without being
//! promoted to a public API or a command line flag.
//!
//! ```
//! use env_param::EnvParam;
//! static WIDTH: EnvParam<u32> = EnvParam::new("MY_TOOL_WIDTH", "80");
//!
//! // variable not set: the default applies
//! assert_eq!(WIDTH.get(), 80);
//! ```
//!
//! A parameter may also be initialized programmatically, which fails if it was
//! already read:
//!
//! ```
//! use env_param::EnvParam;
//! static DEPTH: EnvParam<u32> = EnvParam::new("MY_TOOL_DEPTH", "3");
//!
//! DEPTH.set(5);
//! assert_eq!(DEPTH.get(), 5);
//! ```

use once_cell::sync::OnceCell;
use std::str::FromStr;

/// A lazily-initialized global parameter backed by an environment variable.
pub struct EnvParam<T> {
    cell: OnceCell<T>,
    env: &'static str,
    default: &'static str,
}

impl<T> EnvParam<T> {
    /// Declares a parameter read from the environment variable `env`, falling back
    /// to `default` when unset.
    pub const fn new(env: &'static str, default: &'static str) -> EnvParam<T> {
        EnvParam {
            cell: OnceCell::new(),
            env,
            default,
        }
    }
}

impl<T: FromStr> EnvParam<T> {
    /// Returns the value of the parameter, reading and parsing it on first access.
    ///
    /// # Panics
    /// Panics if the default value does not parse. An unparsable environment value
    /// only produces a warning and falls back to the default.
    pub fn get(&self) -> T
    where
        T: Copy,
    {
        *self.get_ref()
    }

    /// Same as [EnvParam::get] but does not require `T: Copy`.
    pub fn get_ref(&self) -> &T {
        self.cell.get_or_init(|| match std::env::var(self.env) {
            Ok(text) => T::from_str(&text).unwrap_or_else(|_| {
                eprintln!(
                    "[env_param] warning: unparsable value {:?} for {}, using default {:?}",
                    text, self.env, self.default
                );
                self.parsed_default()
            }),
            Err(_) => self.parsed_default(),
        })
    }

    /// Forces the parameter to `value`.
    ///
    /// # Panics
    /// Panics if the parameter was already initialized (read or set).
    pub fn set(&self, value: T) {
        if self.cell.set(value).is_err() {
            panic!("[env_param] {}: already initialized", self.env);
        }
    }

    fn parsed_default(&self) -> T {
        match T::from_str(self.default) {
            Ok(v) => v,
            Err(_) => panic!("[env_param] {}: invalid default value {:?}", self.env, self.default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static UNSET: EnvParam<i32> = EnvParam::new("ENV_PARAM_TEST_UNSET", "42");
    static FORCED: EnvParam<bool> = EnvParam::new("ENV_PARAM_TEST_FORCED", "false");

    #[test]
    fn default_applies_when_unset() {
        assert_eq!(UNSET.get(), 42);
    }

    #[test]
    fn set_before_first_read_wins() {
        FORCED.set(true);
        assert!(FORCED.get());
    }
}
