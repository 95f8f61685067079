//! Badge provisioning wizard.
//!
//! A [`BadgeSession`] walks one user through choosing a destination URL and a
//! target device, then produces the [`ProvisioningMessage`] that programs the
//! device's NFC tag. The session is pure state: publishing the message over
//! the broker link is the caller's job.
//!
//! ```text
//! Intro --start--> SelectDestination --confirm_destination--> SelectDevice
//!                        ^                                         |
//!                        +------------------back-------------------+
//! ```
//!
//! Sending happens *within* `SelectDevice` and never changes the step.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::EntityId;

/// Separator between the device identifier and the URL in a message body.
pub const MESSAGE_SEPARATOR: char = '-';

/// Maximum accepted length of a device hardware identifier.
pub const MAX_DEVICE_ID_LEN: usize = 64;

/// Maximum accepted length of a literal destination URL.
pub const MAX_URL_LEN: usize = 2048;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The wizard's current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Intro,
    SelectDestination,
    SelectDevice,
}

/// Where the provisioned badge should point.
///
/// The two variants are mutually exclusive: choosing one replaces the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Destination {
    /// A stored meta page, referenced by id.
    Page(EntityId),
    /// A literal URL entered by the user.
    Url(String),
}

impl Destination {
    /// Resolve the URL the tag will carry.
    ///
    /// Pages resolve to a pointer URL under `page_base_url`, never to their
    /// content.
    pub fn resolve(&self, page_base_url: &str) -> String {
        match self {
            Destination::Url(url) => url.clone(),
            Destination::Page(id) => format!("{}?id={id}", page_base_url.trim_end_matches('/')),
        }
    }
}

/// Why a send request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendRejection {
    #[error("Broker link is not connected yet")]
    NotConnected,
    #[error("Sending is only possible on the device selection step")]
    WrongStep,
    #[error("No destination URL has been confirmed")]
    MissingDestination,
    #[error("No device has been selected")]
    MissingDevice,
}

/// A ready-to-publish provisioning message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisioningMessage {
    pub device_id: String,
    pub url: String,
    /// `"{device_id}-{url}"`, the exact payload published on the topic.
    pub body: String,
}

impl ProvisioningMessage {
    pub fn new(device_id: &str, url: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            url: url.to_string(),
            body: format!("{device_id}{MESSAGE_SEPARATOR}{url}"),
        }
    }
}

// ---------------------------------------------------------------------------
// BadgeSession
// ---------------------------------------------------------------------------

/// In-memory state of one wizard interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BadgeSession {
    step: WizardStep,
    destination: Option<Destination>,
    device_id: Option<String>,
    final_url: Option<String>,
}

impl Default for BadgeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl BadgeSession {
    /// A fresh session on the `Intro` step.
    pub fn new() -> Self {
        Self {
            step: WizardStep::Intro,
            destination: None,
            device_id: None,
            final_url: None,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn destination(&self) -> Option<&Destination> {
        self.destination.as_ref()
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    pub fn final_url(&self) -> Option<&str> {
        self.final_url.as_deref()
    }

    /// Intro -> SelectDestination.
    pub fn start(&mut self) -> Result<(), CoreError> {
        self.require_step(WizardStep::Intro, "start")?;
        self.step = WizardStep::SelectDestination;
        Ok(())
    }

    /// Choose a stored page as destination, clearing any literal URL.
    pub fn select_page(&mut self, page_id: EntityId) -> Result<(), CoreError> {
        self.require_step(WizardStep::SelectDestination, "select a page")?;
        self.destination = Some(Destination::Page(page_id));
        Ok(())
    }

    /// Choose a literal URL as destination, clearing any selected page.
    pub fn enter_url(&mut self, url: &str) -> Result<(), CoreError> {
        self.require_step(WizardStep::SelectDestination, "enter a URL")?;
        let url = validate_url(url)?;
        self.destination = Some(Destination::Url(url));
        Ok(())
    }

    /// Confirm the chosen destination and move to `SelectDevice`.
    ///
    /// Resolves and stores the final URL.
    pub fn confirm_destination(&mut self, page_base_url: &str) -> Result<&str, CoreError> {
        self.require_step(WizardStep::SelectDestination, "confirm a destination")?;
        let destination = self.destination.as_ref().ok_or_else(|| {
            CoreError::Validation("Choose a page or enter a URL first".to_string())
        })?;

        let url = destination.resolve(page_base_url);
        self.step = WizardStep::SelectDevice;
        Ok(self.final_url.insert(url).as_str())
    }

    /// Choose the target device by hardware identifier.
    pub fn select_device(&mut self, device_id: &str) -> Result<(), CoreError> {
        self.require_step(WizardStep::SelectDevice, "select a device")?;
        self.device_id = Some(validate_device_id(device_id)?);
        Ok(())
    }

    /// SelectDevice -> SelectDestination, forgetting the chosen device.
    pub fn back(&mut self) -> Result<(), CoreError> {
        self.require_step(WizardStep::SelectDevice, "go back")?;
        self.step = WizardStep::SelectDestination;
        self.device_id = None;
        self.final_url = None;
        Ok(())
    }

    /// Build the message to publish, or explain why sending is refused.
    ///
    /// Link health is checked first. The session's step never changes, so the
    /// caller may send repeatedly.
    pub fn prepare_send(&self, link_healthy: bool) -> Result<ProvisioningMessage, SendRejection> {
        if !link_healthy {
            return Err(SendRejection::NotConnected);
        }
        if self.step != WizardStep::SelectDevice {
            return Err(SendRejection::WrongStep);
        }
        let url = self
            .final_url
            .as_deref()
            .ok_or(SendRejection::MissingDestination)?;
        let device_id = self
            .device_id
            .as_deref()
            .ok_or(SendRejection::MissingDevice)?;

        Ok(ProvisioningMessage::new(device_id, url))
    }

    fn require_step(&self, expected: WizardStep, action: &str) -> Result<(), CoreError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "Cannot {action} while on step {:?}",
                self.step
            )))
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a device hardware identifier: non-empty, no whitespace.
///
/// Returns the trimmed identifier.
pub fn validate_device_id(device_id: &str) -> Result<String, CoreError> {
    let trimmed = device_id.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Device id must not be empty".into()));
    }
    if trimmed.len() > MAX_DEVICE_ID_LEN {
        return Err(CoreError::Validation(format!(
            "Device id must be at most {MAX_DEVICE_ID_LEN} characters"
        )));
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(CoreError::Validation(
            "Device id must not contain whitespace".into(),
        ));
    }
    Ok(trimmed.to_string())
}

/// Validate a literal destination URL: non-empty, bounded length.
///
/// Returns the trimmed URL.
pub fn validate_url(url: &str) -> Result<String, CoreError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("URL must not be empty".into()));
    }
    if trimmed.len() > MAX_URL_LEN {
        return Err(CoreError::Validation(format!(
            "URL must be at most {MAX_URL_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
