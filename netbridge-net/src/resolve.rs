//! Host and service resolution into candidate endpoints.

use std::io;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};

use dns_lookup::AddrInfoHints;

use crate::address::Endpoint;
use crate::config::{AddressFamily, TransportMode};
use crate::error::{ResolutionError, SetupError};

/// Resolves hosts and services into [`Endpoint`]s of one address family.
///
/// The family is fixed at construction; every resolution through the same resolver uses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolver {
    family: AddressFamily,
}

impl Resolver {
    /// Creates a resolver for `family`.
    pub fn new(family: AddressFamily) -> Self {
        Self { family }
    }

    /// The family every resolution is restricted to.
    pub fn family(&self) -> AddressFamily {
        self.family
    }

    /// Resolves `host` and `service` into candidate endpoints, best candidate first.
    ///
    /// - Without a host, a passive resolution yields the wildcard address of the family (for
    ///   servers) and an active one yields the loopback address.
    /// - With a host, IP literals (IPv6 optionally in brackets) are used as is and names are looked
    ///   up through the system resolver. Only addresses of the selected family are kept, in the
    ///   order the system returned them.
    ///
    /// `service` is a decimal port number or a service name known to the system (`"http"`);
    /// `"0"` lets the OS pick a port on bind.
    pub fn resolve(
        &self,
        host: Option<&str>,
        service: &str,
        mode: TransportMode,
        passive: bool,
    ) -> Result<Vec<Endpoint>, ResolutionError> {
        let port = self.service_port(service, mode)?;

        let Some(host) = host else {
            let ip = if passive {
                self.family.wildcard()
            } else {
                self.family.loopback()
            };
            return Ok(vec![Endpoint::new(mode, SocketAddr::new(ip, port))]);
        };

        let candidates: Vec<SocketAddr> = match parse_ip_literal(host) {
            Some(ip) => vec![SocketAddr::new(ip, port)],
            None => (host, port)
                .to_socket_addrs()
                .map_err(|source| ResolutionError::Lookup {
                    host: host.to_owned(),
                    source,
                })?
                .collect(),
        };

        let endpoints: Vec<Endpoint> = candidates
            .into_iter()
            .filter(|address| AddressFamily::of(address) == self.family)
            .map(|address| Endpoint::new(mode, address))
            .collect();

        if endpoints.is_empty() {
            return Err(ResolutionError::NoAddress {
                host: host.to_owned(),
                family: self.family,
            });
        }

        tracing::debug!(host, service, count = endpoints.len(), "resolved endpoints");
        Ok(endpoints)
    }

    /// Port of `service`: decimal numbers are parsed, anything else is looked up in the system
    /// services database for this family and `mode`.
    fn service_port(&self, service: &str, mode: TransportMode) -> Result<u16, ResolutionError> {
        if service.is_empty() || service.bytes().all(|byte| byte.is_ascii_digit()) {
            return parse_port(service);
        }

        let hints = AddrInfoHints {
            socktype: mode.socket_type().into(),
            address: self.family.domain().into(),
            ..AddrInfoHints::default()
        };
        let unknown = |source: io::Error| ResolutionError::UnknownService {
            service: service.to_owned(),
            source,
        };
        let port = dns_lookup::getaddrinfo(None, Some(service), Some(hints))
            .map_err(|error| unknown(io::Error::from(error)))?
            .next()
            .ok_or_else(|| unknown(io::ErrorKind::NotFound.into()))?
            .map_err(unknown)?
            .sockaddr
            .port();

        tracing::debug!(service, port, "looked up service");
        Ok(port)
    }
}

/// Runs `attempt` on each candidate in resolver order and returns the first success.
///
/// When every candidate fails, the last failure is returned.
pub(crate) fn try_candidates<T>(
    endpoints: &[Endpoint],
    mut attempt: impl FnMut(&Endpoint) -> Result<T, SetupError>,
) -> Result<T, SetupError> {
    let mut last_error = None;
    for endpoint in endpoints {
        match attempt(endpoint) {
            Ok(value) => return Ok(value),
            Err(error) => {
                tracing::debug!(%endpoint, ?error, "candidate failed");
                last_error = Some(error);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        SetupError::Resolution(ResolutionError::NoCandidates)
    }))
}

fn parse_port(service: &str) -> Result<u16, ResolutionError> {
    service
        .parse()
        .map_err(|source| ResolutionError::InvalidService {
            service: service.to_owned(),
            source,
        })
}

fn parse_ip_literal(host: &str) -> Option<IpAddr> {
    if let Some(inner) = host.strip_prefix('[').and_then(|host| host.strip_suffix(']')) {
        return inner.parse::<std::net::Ipv6Addr>().ok().map(IpAddr::V6);
    }
    host.parse().ok()
}
