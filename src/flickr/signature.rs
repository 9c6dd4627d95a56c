use md5::{Digest, Md5};

use super::Arguments;

/// Flickr's legacy `api_sig`: the MD5 of the shared secret followed by every
/// argument name and value, ordered by argument name.
pub fn api_sig(secret: &str, args: &Arguments) -> String {
    let mut hasher = Md5::new();
    hasher.update(secret.as_bytes());
    for (name, value) in args {
        hasher.update(name.as_bytes());
        hasher.update(value.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Adds the credentials and the signature to a set of arguments.
pub fn sign(api_key: &str, auth_token: &str, secret: &str, mut args: Arguments) -> Arguments {
    args.insert("api_key", api_key.to_string());
    if !auth_token.is_empty() {
        args.insert("auth_token", auth_token.to_string());
    }
    let sig = api_sig(secret, &args);
    args.insert("api_sig", sig);
    args
}
