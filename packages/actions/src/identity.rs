use crate::{CodeAction, FixAllScope};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable instrumentation id for a logical fix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TelemetryId(Uuid);

impl TelemetryId {
    fn derive(type_name: &str, scope: Option<&FixAllScope>, equivalence_key: Option<&str>) -> Self {
        let scope = scope.map_or(0, FixAllScope::telemetry_id);
        let name = match equivalence_key {
            Some(key) => format!("{type_name}|{scope}|k:{key}"),
            None => format!("{type_name}|{scope}|-"),
        };
        TelemetryId(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()))
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for TelemetryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl CodeAction {
    /// Stable across runs for the same producer, key and scope.
    ///
    /// Factory-built actions are identified by the provider that registered
    /// them; the factory types are shared by every provider.
    pub fn get_telemetry_id(&self, scope: Option<&FixAllScope>) -> TelemetryId {
        let type_name = match self.provider_type() {
            Some(provider) if self.created_from_factory() => provider,
            _ => self.runtime_type(),
        };
        TelemetryId::derive(type_name, scope, self.equivalence_key())
    }
}
