//! Interface preferences.

use crate::error::IfaceError;
use crate::list::InterfaceList;
use crate::mask::WantMask;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Preferred interface per address family.
///
/// The raw strings come from the `[interfaces]` section (`ipv4`, `ipv6`) and
/// hold either an interface name or a numeric index. [`configure`] resolves
/// them into `v4_id` / `v6_id`, where 0 means "no preference".
///
/// [`configure`]: InterfaceConfig::configure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceConfig {
    /// IPv4 interface name or index
    #[serde(rename = "ipv4", default)]
    pub v4_iface: String,
    /// IPv6 interface name or index
    #[serde(rename = "ipv6", default)]
    pub v6_iface: String,
    /// Resolved IPv4 interface index
    #[serde(skip)]
    pub v4_id: u32,
    /// Resolved IPv6 interface index
    #[serde(skip)]
    pub v6_id: u32,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    interfaces: InterfaceConfig,
}

/// Read the `[interfaces]` section of a TOML config file
///
/// # Errors
///
/// Returns [`IfaceError::ConfigIo`] if the file cannot be read and
/// [`IfaceError::ConfigParse`] if it is not valid TOML.
pub fn read_config(path: impl AsRef<Path>) -> Result<InterfaceConfig, IfaceError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| IfaceError::ConfigIo {
        path: path.to_path_buf(),
        source,
    })?;
    let file: ConfigFile = toml::from_str(&contents).map_err(|source| IfaceError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(file.interfaces)
}

impl InterfaceConfig {
    /// Preferences from raw strings
    pub fn new(v4_iface: impl Into<String>, v6_iface: impl Into<String>) -> Self {
        Self {
            v4_iface: v4_iface.into(),
            v6_iface: v6_iface.into(),
            ..Self::default()
        }
    }

    /// Resolve both preferences into interface indices.
    ///
    /// A numeric string is used as the index as is, without checking it
    /// exists. A name is matched case-insensitively against `list`; when no
    /// list is given one is enumerated with the default mask, and only if a
    /// name actually needs resolving.
    ///
    /// # Errors
    ///
    /// Returns [`IfaceError::UnknownInterface`] if a name matches nothing, or
    /// the enumeration error if a list had to be created.
    pub fn configure(&mut self, list: Option<&InterfaceList>) -> Result<(), IfaceError> {
        let owned;
        let list = match list {
            Some(list) => Some(list),
            None if is_name(&self.v4_iface) || is_name(&self.v6_iface) => {
                owned = InterfaceList::new(WantMask::NONE)?;
                Some(&owned)
            }
            None => None,
        };
        self.v4_id = resolve(&self.v4_iface, list)?;
        self.v6_id = resolve(&self.v6_iface, list)?;
        debug!(v4 = self.v4_id, v6 = self.v6_id, "interface preferences resolved");
        Ok(())
    }
}

fn is_name(pref: &str) -> bool {
    let pref = pref.trim();
    !pref.is_empty() && pref.parse::<u32>().is_err()
}

fn resolve(pref: &str, list: Option<&InterfaceList>) -> Result<u32, IfaceError> {
    let pref = pref.trim();
    if pref.is_empty() {
        return Ok(0);
    }
    if let Ok(id) = pref.parse::<u32>() {
        return Ok(id);
    }
    match list.map_or(0, |list| list.interface_number(pref)) {
        0 => Err(IfaceError::UnknownInterface {
            name: pref.to_string(),
        }),
        id => Ok(id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::Interface;
    use std::io::Write;

    fn list() -> InterfaceList {
        InterfaceList::from_interfaces(
            vec![
                Interface::new(2, "eth0", vec![]),
                Interface::new(5, "Wi-Fi", vec![]),
            ],
            WantMask::NONE,
        )
    }

    #[test]
    fn test_numeric_preference_skips_lookup() {
        let mut cfg = InterfaceConfig::new("3", "");
        cfg.configure(Some(&list())).unwrap();
        assert_eq!(cfg.v4_id, 3);
        assert_eq!(cfg.v6_id, 0);
    }

    #[test]
    fn test_name_resolution() {
        let mut cfg = InterfaceConfig::new("ETH0", "wi-fi");
        cfg.configure(Some(&list())).unwrap();
        assert_eq!((cfg.v4_id, cfg.v6_id), (2, 5));
    }

    #[test]
    fn test_localized_name_resolution() {
        let list = InterfaceList::from_interfaces(
            vec![Interface::new(4, "Ethernet-Ü", vec![])],
            WantMask::NONE,
        );
        let mut cfg = InterfaceConfig::new("ethernet-ü", "");
        cfg.configure(Some(&list)).unwrap();
        assert_eq!(cfg.v4_id, 4);
    }

    #[test]
    fn test_unknown_name() {
        let mut cfg = InterfaceConfig::new("", "ppp0");
        let err = cfg.configure(Some(&list())).unwrap_err();
        assert!(matches!(err, IfaceError::UnknownInterface { ref name } if name == "ppp0"));
    }

    #[test]
    fn test_negative_number_is_a_name() {
        let mut cfg = InterfaceConfig::new("-1", "");
        assert!(matches!(
            cfg.configure(Some(&list())),
            Err(IfaceError::UnknownInterface { .. })
        ));
    }

    #[test]
    fn test_read_config_section() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[parvati]\nusername = \"marisa\"\n\n[interfaces]\nipv4 = \"eth0\"\nipv6 = \"4\"\n"
        )
        .unwrap();
        let cfg = read_config(file.path()).unwrap();
        assert_eq!(cfg, InterfaceConfig::new("eth0", "4"));
    }

    #[test]
    fn test_read_config_without_section() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[parvati]\nuri = \"https://example.test\"").unwrap();
        assert_eq!(read_config(file.path()).unwrap(), InterfaceConfig::default());
    }

    #[test]
    fn test_read_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(read_config(&missing), Err(IfaceError::ConfigIo { .. })));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[interfaces\nipv4 = ").unwrap();
        assert!(matches!(read_config(&bad), Err(IfaceError::ConfigParse { .. })));
    }
}
