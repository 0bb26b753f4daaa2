//! HTTP reachability of the monitored services.

use std::time::Duration;

use futures_util::future::join_all;
use reqwest::redirect::Policy;
use reqwest::StatusCode;

use super::{Probe, ProbeError};
use crate::config::ServiceTarget;
use crate::types::{HealthState, ServiceStates};

/// 2xx, 3xx and 401 (auth wall in front of a live service) count as online.
pub fn classify(status: StatusCode) -> HealthState {
    if status.is_success() || status.is_redirection() || status == StatusCode::UNAUTHORIZED {
        HealthState::Online
    } else {
        HealthState::Offline
    }
}

pub struct ServiceHealthProbe {
    client: reqwest::Client,
    targets: Vec<ServiceTarget>,
    timeout: Duration,
}

impl ServiceHealthProbe {
    pub fn new(targets: Vec<ServiceTarget>, timeout: Duration) -> Result<Self, reqwest::Error> {
        // Redirects are a valid answer; do not chase them.
        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            targets,
            timeout,
        })
    }

    pub fn targets(&self) -> &[ServiceTarget] {
        &self.targets
    }

    /// Probe every target concurrently; result order is the configured order.
    pub async fn probe_all(&self) -> ServiceStates {
        let checks = self.targets.iter().map(|target| async move {
            let check = ServiceCheck {
                client: &self.client,
                target,
            };
            let state = check.probe(self.timeout).await.value();
            (target.name.clone(), state)
        });
        ServiceStates(join_all(checks).await)
    }
}

/// One service's reachability check.
pub struct ServiceCheck<'a> {
    pub client: &'a reqwest::Client,
    pub target: &'a ServiceTarget,
}

impl Probe for ServiceCheck<'_> {
    type Output = HealthState;

    fn name(&self) -> &str {
        &self.target.name
    }

    async fn fetch(&self) -> Result<HealthState, ProbeError> {
        let resp = self.client.get(&self.target.url).send().await?;
        match classify(resp.status()) {
            HealthState::Online => Ok(HealthState::Online),
            HealthState::Offline => Err(ProbeError::Status(resp.status().as_u16())),
        }
    }
}
