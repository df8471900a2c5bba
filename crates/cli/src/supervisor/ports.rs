// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Domain id allocation and RTPS port arithmetic.
//!
//! Each benchmark run gets its own middleware domain so concurrent runs do not
//! discover each other. A [`DomainLease`] holds the domain for the lifetime of
//! the run and releases it on drop.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::net::UdpSocket;
use std::sync::Arc;
use thiserror::Error;

pub const PORT_BASE: u32 = 7400;
pub const DOMAIN_GAIN: u32 = 250;
pub const PARTICIPANT_GAIN: u32 = 2;
const OFFSET_DISCOVERY_MULTICAST: u32 = 0;
const OFFSET_DISCOVERY_UNICAST: u32 = 10;
const OFFSET_USER_MULTICAST: u32 = 1;
const OFFSET_USER_UNICAST: u32 = 11;

/// Largest domain id whose base ports fit in 16 bits
pub const MAX_DOMAIN_ID: u32 = 232;

/// Highest participant id considered when validating a domain
pub const MAX_PARTICIPANT_ID: u32 = 119;

/// Domain ids searched by [`DomainLeases::acquire`] by default
pub const DEFAULT_DOMAIN_START: u32 = 50;
pub const DEFAULT_DOMAIN_END: u32 = 100;

/// The four well-known RTPS ports of one participant in a domain
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DomainPorts {
    pub domain_id: u32,
    pub discovery_multicast: u32,
    pub discovery_unicast: u32,
    pub user_multicast: u32,
    pub user_unicast: u32,
}

impl DomainPorts {
    pub fn calculate(domain_id: u32, participant_id: u32) -> Self {
        let base = PORT_BASE + DOMAIN_GAIN * domain_id;
        let participant = PARTICIPANT_GAIN * participant_id;
        Self {
            domain_id,
            discovery_multicast: base + OFFSET_DISCOVERY_MULTICAST,
            discovery_unicast: base + OFFSET_DISCOVERY_UNICAST + participant,
            user_multicast: base + OFFSET_USER_MULTICAST,
            user_unicast: base + OFFSET_USER_UNICAST + participant,
        }
    }

    pub fn all(&self) -> [u32; 4] {
        [
            self.discovery_multicast,
            self.discovery_unicast,
            self.user_multicast,
            self.user_unicast,
        ]
    }

    pub fn max_port(&self) -> u32 {
        self.all().into_iter().max().unwrap_or(0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LeaseError {
    #[error("domain id {0} is too high (max safe value: {MAX_DOMAIN_ID})")]
    TooHigh(u32),

    #[error("domain id {domain_id} would use invalid port {port}")]
    PortOverflow { domain_id: u32, port: u32 },

    #[error("domain id {0} is already leased by another run")]
    InUse(u32),

    #[error("no free domain id in {start}..{end}")]
    Exhausted { start: u32, end: u32 },
}

/// Reject domain ids whose ports would overflow for any participant
pub fn validate_domain_id(domain_id: u32) -> Result<(), LeaseError> {
    if domain_id > MAX_DOMAIN_ID {
        return Err(LeaseError::TooHigh(domain_id));
    }
    let port = DomainPorts::calculate(domain_id, MAX_PARTICIPANT_ID).max_port();
    if port > u32::from(u16::MAX) {
        return Err(LeaseError::PortOverflow { domain_id, port });
    }
    Ok(())
}

/// Whether a UDP port can currently be bound on all interfaces
pub fn is_port_available(port: u32) -> bool {
    match u16::try_from(port) {
        Ok(port) => UdpSocket::bind(("0.0.0.0", port)).is_ok(),
        Err(_) => false,
    }
}

/// Whether every port of participant 0 in the domain is free
pub fn is_domain_available(domain_id: u32) -> bool {
    DomainPorts::calculate(domain_id, 0)
        .all()
        .into_iter()
        .all(is_port_available)
}

/// Registry of domain ids leased by concurrent runs
#[derive(Clone, Debug)]
pub struct DomainLeases {
    leased: Arc<Mutex<BTreeSet<u32>>>,
    start: u32,
    end: u32,
}

impl Default for DomainLeases {
    fn default() -> Self {
        Self::new(DEFAULT_DOMAIN_START, DEFAULT_DOMAIN_END)
    }
}

impl DomainLeases {
    /// Lease ids from `start..end`
    pub fn new(start: u32, end: u32) -> Self {
        Self {
            leased: Arc::new(Mutex::new(BTreeSet::new())),
            start,
            end: end.min(MAX_DOMAIN_ID + 1),
        }
    }

    /// Lease a free domain id from the range.
    ///
    /// Candidates are tried in random order to reduce collisions with other
    /// harness instances on the same host; a candidate must not be leased here
    /// and its ports must be bindable.
    pub fn acquire(&self) -> Result<DomainLease, LeaseError> {
        let mut candidates: Vec<u32> = (self.start..self.end).collect();
        fastrand::shuffle(&mut candidates);

        let mut leased = self.leased.lock();
        for domain_id in candidates {
            if leased.contains(&domain_id) || validate_domain_id(domain_id).is_err() {
                continue;
            }
            if is_domain_available(domain_id) {
                leased.insert(domain_id);
                tracing::debug!(domain_id, "leased domain");
                return Ok(self.lease(domain_id));
            }
        }
        Err(LeaseError::Exhausted {
            start: self.start,
            end: self.end,
        })
    }

    /// Lease a specific domain id, e.g. one fixed by task configuration.
    ///
    /// Port availability is not probed: a configured domain is used as-is.
    pub fn claim(&self, domain_id: u32) -> Result<DomainLease, LeaseError> {
        validate_domain_id(domain_id)?;
        if !self.leased.lock().insert(domain_id) {
            return Err(LeaseError::InUse(domain_id));
        }
        Ok(self.lease(domain_id))
    }

    pub fn is_leased(&self, domain_id: u32) -> bool {
        self.leased.lock().contains(&domain_id)
    }

    pub fn leased(&self) -> Vec<u32> {
        self.leased.lock().iter().copied().collect()
    }

    fn lease(&self, domain_id: u32) -> DomainLease {
        DomainLease {
            domain_id,
            leased: Arc::clone(&self.leased),
        }
    }
}

/// A domain id held by one run; released on drop
pub struct DomainLease {
    domain_id: u32,
    leased: Arc<Mutex<BTreeSet<u32>>>,
}

impl DomainLease {
    pub fn domain_id(&self) -> u32 {
        self.domain_id
    }

    pub fn ports(&self) -> DomainPorts {
        DomainPorts::calculate(self.domain_id, 0)
    }
}

impl Drop for DomainLease {
    fn drop(&mut self) {
        self.leased.lock().remove(&self.domain_id);
        tracing::debug!(domain_id = self.domain_id, "released domain");
    }
}

impl std::fmt::Debug for DomainLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainLease")
            .field("domain_id", &self.domain_id)
            .finish()
    }
}

#[cfg(test)]
#[path = "ports_tests.rs"]
mod tests;
