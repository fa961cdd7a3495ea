//! Server configuration (spec §2 ADDED), a getset-derived builder in the
//! shape of the teacher's own `ServerOptions`.

use getset::{Getters, Setters, WithSetters};

#[derive(Getters, Setters, WithSetters, Debug, Clone)]
#[getset(get = "pub", set = "pub", set_with = "pub")]
pub struct ServerOptions {
    host: String,
    port: u16,
    /// Hard cap on rows accepted from a `DataProvider` before the engine
    /// runs; requests over this become `data_truncated` warnings rather
    /// than `internal_error`s, per spec §7's recovered-locally bucket.
    max_rows: usize,
    /// BCP-47 tag used when a request carries no `hl` parameter and no
    /// `Accept-Language` header.
    default_locale: String,
    /// How many response signatures to remember for the `not_modified`
    /// short-circuit; 0 disables the cache (signatures are still
    /// computed per-request, just never compared against a prior one).
    signature_cache_size: usize,
}

impl ServerOptions {
    pub fn new() -> ServerOptions {
        ServerOptions::default()
    }
}

impl Default for ServerOptions {
    fn default() -> Self {
        ServerOptions {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_rows: 1_000_000,
            default_locale: "en".to_string(),
            signature_cache_size: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_values() {
        let opts = ServerOptions::new();
        assert_eq!(opts.host(), "127.0.0.1");
        assert_eq!(*opts.port(), 8080);
        assert_eq!(*opts.max_rows(), 1_000_000);
    }

    #[test]
    fn with_setters_chain() {
        let opts = ServerOptions::new().with_host("0.0.0.0".to_string()).with_port(9000);
        assert_eq!(opts.host(), "0.0.0.0");
        assert_eq!(*opts.port(), 9000);
    }
}
