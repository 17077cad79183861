//! The sandbox spec type and its creation-time normalization rules.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    config::{
        DEFAULT_AIO_CN_IMAGE, DEFAULT_AIO_IMAGE, DEFAULT_CPU_LIMIT, DEFAULT_CPU_REQUEST,
        DEFAULT_IDLE_TIMEOUT_MINUTES, DEFAULT_MEMORY_LIMIT, DEFAULT_MEMORY_REQUEST,
        DEFAULT_TIMEOUT_MINUTES, FALLBACK_IMAGE, MAX_IDLE_TIMEOUT_MINUTES, MAX_TIMEOUT_MINUTES,
        NODE_IMAGE, PYTHON_IMAGE, SHELL_IMAGE,
    },
    SandgateError, SandgateResult,
};

use super::quantity;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Requested state of a single sandbox.
///
/// This is the external JSON contract: the same shape is accepted on create,
/// embedded verbatim in the workload annotation, and returned by get and list.
/// Absent fields land on the documented defaults during deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sandbox {
    /// Unique sandbox name. Must be a valid DNS label.
    #[serde(default)]
    pub name: String,

    /// Application tag associating the sandbox with a caller-defined app.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub app: String,

    /// Environment type used to resolve the image when `image` is unset,
    /// e.g. `python`, `shell`, `node`, `aio`.
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,

    /// Container image. Resolved from `kind` when empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,

    /// Container args, overriding any command baked into the image.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Environment variables set on every instance.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    /// Maximum lifetime in minutes. Capped at 1440.
    #[serde(default = "Sandbox::default_timeout")]
    pub timeout: u32,

    /// Idle window in minutes before the idle policy applies. Capped at 60.
    #[serde(default = "Sandbox::default_idle_timeout")]
    pub idle_timeout: u32,

    /// What happens once the idle window elapses.
    #[serde(default)]
    pub idle_policy: IdlePolicy,

    /// Working directory for the container.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub workdir: String,

    /// CPU request quantity.
    #[serde(default = "Sandbox::default_cpu")]
    pub cpu: String,

    /// Memory request quantity.
    #[serde(default = "Sandbox::default_memory")]
    pub memory: String,

    /// CPU limit quantity.
    #[serde(default = "Sandbox::default_cpu_limit")]
    pub cpu_limit: String,

    /// Memory limit quantity.
    #[serde(default = "Sandbox::default_memory_limit")]
    pub memory_limit: String,

    /// Ports the workload exposes, in caller order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<u16>,

    /// Lifecycle phase recorded on the spec at creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SandboxStatus>,
}

/// What happens to a sandbox once its idle window elapses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdlePolicy {
    /// Remove the sandbox entirely.
    #[default]
    Delete,

    /// Scale the workload down without removing its record.
    Scaledown,
}

/// Lifecycle phase recorded on a sandbox spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxStatus {
    /// The workload has been submitted and is starting up.
    Creating,

    /// The workload reported ready.
    Running,

    /// The idle window elapsed without traffic.
    Idle,

    /// Deletion has been requested.
    Deleting,

    /// The workload failed.
    Error,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Sandbox {
    /// Applies the creation-time normalization rules in place.
    ///
    /// Caps `timeout` and `idle_timeout`, resolves the image from `kind` when
    /// no explicit image is set, and stamps the initial status.
    pub fn normalize(&mut self) {
        if self.timeout > MAX_TIMEOUT_MINUTES {
            self.timeout = MAX_TIMEOUT_MINUTES;
        }
        if self.idle_timeout > MAX_IDLE_TIMEOUT_MINUTES {
            self.idle_timeout = MAX_IDLE_TIMEOUT_MINUTES;
        }

        if self.image.is_empty() {
            self.image = match self.kind.as_str() {
                "python" => PYTHON_IMAGE,
                "shell" => SHELL_IMAGE,
                "node" => NODE_IMAGE,
                "aio" => DEFAULT_AIO_IMAGE,
                "aiocn" => DEFAULT_AIO_CN_IMAGE,
                _ => FALLBACK_IMAGE,
            }
            .to_string();
        }

        if self.status.is_none() {
            self.status = Some(SandboxStatus::Creating);
        }
    }

    /// Checks that the spec can be rendered into a workload manifest.
    pub fn validate(&self) -> SandgateResult<()> {
        validate_name(&self.name)?;

        quantity::parse_cpu_millis(&self.cpu)?;
        quantity::parse_cpu_millis(&self.cpu_limit)?;
        quantity::parse_memory_bytes(&self.memory)?;
        quantity::parse_memory_bytes(&self.memory_limit)?;

        Ok(())
    }

    fn default_timeout() -> u32 {
        DEFAULT_TIMEOUT_MINUTES
    }

    fn default_idle_timeout() -> u32 {
        DEFAULT_IDLE_TIMEOUT_MINUTES
    }

    fn default_cpu() -> String {
        DEFAULT_CPU_REQUEST.to_string()
    }

    fn default_memory() -> String {
        DEFAULT_MEMORY_REQUEST.to_string()
    }

    fn default_cpu_limit() -> String {
        DEFAULT_CPU_LIMIT.to_string()
    }

    fn default_memory_limit() -> String {
        DEFAULT_MEMORY_LIMIT.to_string()
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Default for Sandbox {
    fn default() -> Self {
        Self {
            name: String::new(),
            app: String::new(),
            kind: String::new(),
            image: String::new(),
            args: Vec::new(),
            env: BTreeMap::new(),
            timeout: DEFAULT_TIMEOUT_MINUTES,
            idle_timeout: DEFAULT_IDLE_TIMEOUT_MINUTES,
            idle_policy: IdlePolicy::Delete,
            workdir: String::new(),
            cpu: DEFAULT_CPU_REQUEST.to_string(),
            memory: DEFAULT_MEMORY_REQUEST.to_string(),
            cpu_limit: DEFAULT_CPU_LIMIT.to_string(),
            memory_limit: DEFAULT_MEMORY_LIMIT.to_string(),
            ports: Vec::new(),
            status: None,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Checks that a sandbox name is a valid DNS label.
pub fn validate_name(name: &str) -> SandgateResult<()> {
    if name.is_empty() {
        return Err(SandgateError::validation("sandbox name is empty"));
    }
    if name.len() > 63 {
        return Err(SandgateError::validation(format!(
            "sandbox name exceeds 63 characters: {name}"
        )));
    }
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    let valid_edges = name.starts_with(|c: char| c.is_ascii_lowercase() || c.is_ascii_digit())
        && name.ends_with(|c: char| c.is_ascii_lowercase() || c.is_ascii_digit());
    if !valid_chars || !valid_edges {
        return Err(SandgateError::validation(format!(
            "sandbox name must be a lowercase DNS label: {name}"
        )));
    }

    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_caps_and_resolves_image() {
        let mut sandbox = Sandbox {
            name: "caps".to_string(),
            kind: "python".to_string(),
            timeout: 2000,
            idle_timeout: 120,
            ..Default::default()
        };

        sandbox.normalize();

        assert_eq!(sandbox.timeout, 1440);
        assert_eq!(sandbox.idle_timeout, 60);
        assert_eq!(sandbox.image, "python:3.9-slim");
        assert_eq!(sandbox.status, Some(SandboxStatus::Creating));
    }

    #[test]
    fn test_normalize_image_table() {
        let cases = [
            ("python", PYTHON_IMAGE),
            ("shell", SHELL_IMAGE),
            ("node", NODE_IMAGE),
            ("aio", DEFAULT_AIO_IMAGE),
            ("aiocn", DEFAULT_AIO_CN_IMAGE),
            ("anything-else", FALLBACK_IMAGE),
            ("", FALLBACK_IMAGE),
        ];

        for (kind, expected) in cases {
            let mut sandbox = Sandbox {
                name: "img".to_string(),
                kind: kind.to_string(),
                ..Default::default()
            };
            sandbox.normalize();
            assert_eq!(sandbox.image, expected, "kind {kind:?}");
        }
    }

    #[test]
    fn test_normalize_keeps_explicit_image() {
        let mut sandbox = Sandbox {
            name: "explicit".to_string(),
            kind: "python".to_string(),
            image: "registry.example.com/custom:1".to_string(),
            ..Default::default()
        };

        sandbox.normalize();

        assert_eq!(sandbox.image, "registry.example.com/custom:1");
    }

    #[test]
    fn test_deserialize_fills_defaults() -> anyhow::Result<()> {
        let sandbox: Sandbox = serde_json::from_str(r#"{"name": "mini"}"#)?;

        assert_eq!(sandbox.timeout, 60);
        assert_eq!(sandbox.idle_timeout, 10);
        assert_eq!(sandbox.idle_policy, IdlePolicy::Delete);
        assert_eq!(sandbox.cpu, "100m");
        assert_eq!(sandbox.memory, "128Mi");
        assert_eq!(sandbox.cpu_limit, "1000m");
        assert_eq!(sandbox.memory_limit, "1024Mi");
        assert!(sandbox.status.is_none());

        Ok(())
    }

    #[test]
    fn test_serialize_uses_wire_field_names() -> anyhow::Result<()> {
        let mut sandbox = Sandbox {
            name: "wire".to_string(),
            kind: "shell".to_string(),
            ..Default::default()
        };
        sandbox.normalize();

        let json = serde_json::to_value(&sandbox)?;

        assert_eq!(json["type"], "shell");
        assert_eq!(json["idle_policy"], "delete");
        assert_eq!(json["status"], "creating");
        assert!(json.get("app").is_none());
        assert!(json.get("ports").is_none());

        Ok(())
    }

    #[test]
    fn test_json_round_trip_preserves_spec() -> anyhow::Result<()> {
        let mut sandbox = Sandbox {
            name: "round".to_string(),
            kind: "node".to_string(),
            args: vec!["--inspect".to_string()],
            ports: vec![3000, 9229],
            ..Default::default()
        };
        sandbox.env.insert("DEBUG".to_string(), "1".to_string());
        sandbox.normalize();

        let decoded: Sandbox = serde_json::from_str(&serde_json::to_string(&sandbox)?)?;

        assert_eq!(decoded, sandbox);

        Ok(())
    }

    #[test]
    fn test_validate_rejects_bad_names() {
        for bad in ["", "UPPER", "has_underscore", "-edge", "edge-", "a b"] {
            let sandbox = Sandbox {
                name: bad.to_string(),
                ..Default::default()
            };
            assert!(
                matches!(sandbox.validate(), Err(SandgateError::Validation(_))),
                "expected rejection for {bad:?}"
            );
        }

        let long = Sandbox {
            name: "a".repeat(64),
            ..Default::default()
        };
        assert!(matches!(long.validate(), Err(SandgateError::Validation(_))));
    }

    #[test]
    fn test_validate_rejects_bad_quantities() {
        let sandbox = Sandbox {
            name: "quant".to_string(),
            cpu: "lots".to_string(),
            ..Default::default()
        };

        assert!(matches!(
            sandbox.validate(),
            Err(SandgateError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_accepts_defaults() -> anyhow::Result<()> {
        let sandbox = Sandbox {
            name: "ok-name".to_string(),
            ..Default::default()
        };

        sandbox.validate()?;

        Ok(())
    }
}
