//! Functions available to manifest templates
//!
//! The set is fixed and installed once into the template environment when a
//! render context is built; it is never modified afterwards. Lookups into the
//! release payload fail the render instead of producing an empty string.
//!
//! | Name | Call | Result |
//! |------|------|--------|
//! | `version` | `version("release")` | component version from the release payload |
//! | `imageFor` | `imageFor("hyperkube")` | component image from the release payload |
//! | `base64String` | `base64String(text)` | standard base64 of `text` |
//! | `indent` | `indent(4, text)` | `text` with every line prefixed by 4 spaces |
//! | `address` | `address("10.0.0.0/16")` | network address of a CIDR |
//! | `mask` | `mask("10.0.0.0/16")` | prefix length of a CIDR |
//! | `randomString` | `randomString(32)` | fresh alphanumeric secret |
//! | `include` | `include("x.yaml")` | `x.yaml` rendered against the cluster parameters |
//! | `includeData` | `includeData("x.yaml")` | raw content of the asset `x.yaml` |
//! | `includeVPN` | `includeVPN()` | whether the VPN components are rendered |
//! | `trimTrailingSpace` | `trimTrailingSpace(text)` | `text` minus trailing whitespace per line |
//!
//! Nested `include` calls are bounded by [`MAX_INCLUDE_DEPTH`]; a template that
//! includes itself, directly or through a cycle, fails the render.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use minijinja::{Environment, Error, ErrorKind, State, Value};
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::assets::AssetSource;
use crate::release::ReleasePayload;

/// Names of every function the registry installs
pub const FUNCTION_NAMES: [&str; 11] = [
    "version",
    "imageFor",
    "base64String",
    "indent",
    "address",
    "mask",
    "randomString",
    "include",
    "includeData",
    "includeVPN",
    "trimTrailingSpace",
];

/// Deepest chain of nested `include` calls a render may build
pub const MAX_INCLUDE_DEPTH: usize = 16;

thread_local! {
    static INCLUDE_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Holds one level of `include` nesting until dropped
struct IncludeGuard;

impl IncludeGuard {
    fn enter(name: &str) -> Result<Self, Error> {
        INCLUDE_DEPTH.with(|depth| {
            if depth.get() >= MAX_INCLUDE_DEPTH {
                return Err(Error::new(
                    ErrorKind::InvalidOperation,
                    format!(
                        "include of {:?} exceeds {} nested includes",
                        name, MAX_INCLUDE_DEPTH
                    ),
                ));
            }
            depth.set(depth.get() + 1);
            Ok(IncludeGuard)
        })
    }
}

impl Drop for IncludeGuard {
    fn drop(&mut self) {
        INCLUDE_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Immutable table of template functions for one render pass
///
/// Holds the release payload lookups and the VPN toggle. Asset and parameter
/// bound functions (`include`, `includeData`) are attached when the table is
/// installed into an environment.
#[derive(Clone, Debug)]
pub struct FunctionRegistry {
    images: Arc<BTreeMap<String, String>>,
    versions: Arc<BTreeMap<String, String>>,
    include_vpn: bool,
}

impl FunctionRegistry {
    /// Build the table for a release payload and VPN setting
    pub fn new(payload: &ReleasePayload, include_vpn: bool) -> Self {
        Self {
            images: Arc::new(payload.images.clone()),
            versions: Arc::new(payload.versions.clone()),
            include_vpn,
        }
    }

    /// Register every function into `env`
    ///
    /// `params` is the value `include` renders nested templates against.
    pub(crate) fn install(
        &self,
        env: &mut Environment<'static>,
        assets: Arc<dyn AssetSource>,
        params: Value,
    ) {
        let versions = Arc::clone(&self.versions);
        env.add_function("version", move |component: &str| {
            payload_lookup(&versions, "version", component)
        });

        let images = Arc::clone(&self.images);
        env.add_function("imageFor", move |component: &str| {
            payload_lookup(&images, "image", component)
        });

        env.add_function("base64String", base64_string);
        env.add_function("indent", indent);
        env.add_function("address", cidr_address);
        env.add_function("mask", cidr_mask);
        env.add_function("randomString", random_string);
        env.add_function("trimTrailingSpace", trim_trailing_space);

        let include_vpn = self.include_vpn;
        env.add_function("includeVPN", move || include_vpn);

        env.add_function(
            "include",
            move |state: &State, name: &str| -> Result<String, Error> {
                let _depth = IncludeGuard::enter(name)?;
                state.env().get_template(name)?.render(&params)
            },
        );

        env.add_function("includeData", move |name: &str| -> Result<String, Error> {
            match assets.read(name) {
                Ok(Some(data)) => Ok(data),
                Ok(None) => Err(Error::new(
                    ErrorKind::TemplateNotFound,
                    format!("asset not found: {}", name),
                )),
                Err(e) => Err(Error::new(ErrorKind::InvalidOperation, e.to_string())),
            }
        });
    }
}

fn payload_lookup(
    table: &BTreeMap<String, String>,
    what: &str,
    component: &str,
) -> Result<String, Error> {
    table.get(component).cloned().ok_or_else(|| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("release payload has no {} for component {:?}", what, component),
        )
    })
}

/// Standard base64 encoding of `text`
pub fn base64_string(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// Prefix every line of `text` with `spaces` spaces
///
/// A trailing newline also receives the pad, so output embedded in a YAML
/// block is usually passed through `trimTrailingSpace`.
pub fn indent(spaces: usize, text: &str) -> String {
    let pad = " ".repeat(spaces);
    format!("{}{}", pad, text.replace('\n', &format!("\n{}", pad)))
}

/// Strip trailing whitespace from every line of `text`
pub fn trim_trailing_space(text: &str) -> String {
    text.split('\n')
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fresh alphanumeric token of `len` characters from the thread-local CSPRNG
pub fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Network address of a CIDR block
pub fn cidr_address(cidr: &str) -> Result<String, Error> {
    parse_cidr(cidr)
        .map(|c| c.network.to_string())
        .map_err(|e| Error::new(ErrorKind::InvalidOperation, e))
}

/// Prefix length of a CIDR block
pub fn cidr_mask(cidr: &str) -> Result<u8, Error> {
    parse_cidr(cidr)
        .map(|c| c.prefix)
        .map_err(|e| Error::new(ErrorKind::InvalidOperation, e))
}

/// A parsed CIDR block with host bits cleared
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cidr {
    /// Network address
    pub network: IpAddr,
    /// Prefix length in bits
    pub prefix: u8,
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix)
    }
}

/// Parse an IPv4 or IPv6 CIDR block such as `10.128.0.0/14`
pub fn parse_cidr(cidr: &str) -> Result<Cidr, String> {
    let invalid = || format!("invalid CIDR address: {:?}", cidr);

    let (addr, prefix) = cidr.split_once('/').ok_or_else(invalid)?;
    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let ip: IpAddr = addr.parse().map_err(|_| invalid())?;
    let prefix: u8 = prefix.parse().map_err(|_| invalid())?;

    let network = match ip {
        IpAddr::V4(v4) => {
            if prefix > 32 {
                return Err(invalid());
            }
            let mask = u32::MAX.checked_shl(32 - u32::from(prefix)).unwrap_or(0);
            IpAddr::V4(Ipv4Addr::from(u32::from(v4) & mask))
        }
        IpAddr::V6(v6) => {
            if prefix > 128 {
                return Err(invalid());
            }
            let mask = u128::MAX.checked_shl(128 - u32::from(prefix)).unwrap_or(0);
            IpAddr::V6(Ipv6Addr::from(u128::from(v6) & mask))
        }
    };

    Ok(Cidr { network, prefix })
}
