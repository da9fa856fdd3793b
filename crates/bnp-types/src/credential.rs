//! Switch access credentials
//!
//! A credential record carries exactly one protocol variant. Switches refer
//! to credentials either by UUID or by name, so names must never parse as a
//! UUID.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use uuid::Uuid;

/// Minimum length of SNMPv3 authentication and privacy keys
pub const MIN_USM_KEY_LEN: usize = 8;

/// Device management protocol of a switch or credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ManagementProtocol {
    /// SNMP version 1
    SnmpV1,
    /// SNMP version 2c
    SnmpV2c,
    /// SNMP version 3
    SnmpV3,
    /// NETCONF over SSH
    NetconfSsh,
    /// NETCONF over SOAP
    NetconfSoap,
}

impl ManagementProtocol {
    /// Wire name (`snmpv2c`, `netconf_ssh`, ...)
    pub fn as_str(self) -> &'static str {
        match self {
            ManagementProtocol::SnmpV1 => "snmpv1",
            ManagementProtocol::SnmpV2c => "snmpv2c",
            ManagementProtocol::SnmpV3 => "snmpv3",
            ManagementProtocol::NetconfSsh => "netconf_ssh",
            ManagementProtocol::NetconfSoap => "netconf_soap",
        }
    }

    /// Any SNMP version
    pub fn is_snmp(self) -> bool {
        matches!(
            self,
            ManagementProtocol::SnmpV1 | ManagementProtocol::SnmpV2c | ManagementProtocol::SnmpV3
        )
    }

    /// Protocol component of a driver key; every SNMP version is `snmp`
    pub fn driver_protocol(self) -> &'static str {
        if self.is_snmp() { "snmp" } else { self.as_str() }
    }
}

impl FromStr for ManagementProtocol {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "snmpv1" => Ok(ManagementProtocol::SnmpV1),
            "snmpv2c" => Ok(ManagementProtocol::SnmpV2c),
            "snmpv3" => Ok(ManagementProtocol::SnmpV3),
            "netconf_ssh" => Ok(ManagementProtocol::NetconfSsh),
            "netconf_soap" => Ok(ManagementProtocol::NetconfSoap),
            _ => Err(ModelError::UnsupportedProtocol(s.to_string())),
        }
    }
}

impl fmt::Display for ManagementProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for ManagementProtocol {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ManagementProtocol> for String {
    fn from(value: ManagementProtocol) -> Self {
        value.as_str().to_string()
    }
}

/// SNMPv3 authentication protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AuthProtocol {
    /// HMAC-MD5-96
    Md5,
    /// HMAC-SHA-96
    Sha,
}

impl AuthProtocol {
    /// Canonical name
    pub fn as_str(self) -> &'static str {
        match self {
            AuthProtocol::Md5 => "md5",
            AuthProtocol::Sha => "sha",
        }
    }
}

impl FromStr for AuthProtocol {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md5" => Ok(AuthProtocol::Md5),
            "sha" | "sha1" => Ok(AuthProtocol::Sha),
            _ => Err(ModelError::UnsupportedSecurityProtocol(s.to_string())),
        }
    }
}

impl TryFrom<String> for AuthProtocol {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AuthProtocol> for String {
    fn from(value: AuthProtocol) -> Self {
        value.as_str().to_string()
    }
}

/// SNMPv3 privacy protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PrivProtocol {
    /// CBC-DES
    Des,
    /// Triple DES EDE
    TripleDes,
    /// AES-128 CFB
    Aes128,
    /// AES-192 CFB
    Aes192,
    /// AES-256 CFB
    Aes256,
}

impl PrivProtocol {
    /// Canonical name
    pub fn as_str(self) -> &'static str {
        match self {
            PrivProtocol::Des => "des",
            PrivProtocol::TripleDes => "3des",
            PrivProtocol::Aes128 => "aes128",
            PrivProtocol::Aes192 => "aes192",
            PrivProtocol::Aes256 => "aes256",
        }
    }
}

impl FromStr for PrivProtocol {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "des" | "des56" => Ok(PrivProtocol::Des),
            "3des" => Ok(PrivProtocol::TripleDes),
            "aes" | "aes128" => Ok(PrivProtocol::Aes128),
            "aes192" => Ok(PrivProtocol::Aes192),
            "aes256" => Ok(PrivProtocol::Aes256),
            _ => Err(ModelError::UnsupportedSecurityProtocol(s.to_string())),
        }
    }
}

impl TryFrom<String> for PrivProtocol {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PrivProtocol> for String {
    fn from(value: PrivProtocol) -> Self {
        value.as_str().to_string()
    }
}

/// Protocol specific access parameters, tagged by `protocol_type`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "protocol_type")]
pub enum AccessParameters {
    /// SNMPv1 community
    #[serde(rename = "snmpv1")]
    SnmpV1 {
        /// Read-write community
        write_community: String,
    },
    /// SNMPv2c community
    #[serde(rename = "snmpv2c")]
    SnmpV2c {
        /// Read-write community
        write_community: String,
    },
    /// SNMPv3 USM user
    #[serde(rename = "snmpv3")]
    SnmpV3 {
        /// USM user name
        security_name: String,
        /// Authentication protocol
        #[serde(default, skip_serializing_if = "Option::is_none")]
        auth_protocol: Option<AuthProtocol>,
        /// Authentication passphrase
        #[serde(default, skip_serializing_if = "Option::is_none")]
        auth_key: Option<String>,
        /// Privacy protocol
        #[serde(default, skip_serializing_if = "Option::is_none")]
        priv_protocol: Option<PrivProtocol>,
        /// Privacy passphrase
        #[serde(default, skip_serializing_if = "Option::is_none")]
        priv_key: Option<String>,
    },
    /// NETCONF over SSH
    #[serde(rename = "netconf_ssh")]
    NetconfSsh {
        /// Login user
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_name: Option<String>,
        /// Login password
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password: Option<String>,
        /// Private key file
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key_path: Option<String>,
    },
    /// NETCONF over SOAP
    #[serde(rename = "netconf_soap")]
    NetconfSoap {
        /// Login user
        user_name: String,
        /// Login password
        password: String,
    },
}

impl AccessParameters {
    /// Management protocol these parameters are for
    pub fn protocol(&self) -> ManagementProtocol {
        match self {
            AccessParameters::SnmpV1 { .. } => ManagementProtocol::SnmpV1,
            AccessParameters::SnmpV2c { .. } => ManagementProtocol::SnmpV2c,
            AccessParameters::SnmpV3 { .. } => ManagementProtocol::SnmpV3,
            AccessParameters::NetconfSsh { .. } => ManagementProtocol::NetconfSsh,
            AccessParameters::NetconfSoap { .. } => ManagementProtocol::NetconfSoap,
        }
    }

    /// Check the field pairing rules of the variant
    pub fn validate(&self) -> Result<(), ModelError> {
        match self {
            AccessParameters::SnmpV1 { write_community } | AccessParameters::SnmpV2c { write_community } => {
                require_non_empty(write_community, "write_community")
            }
            AccessParameters::SnmpV3 {
                security_name,
                auth_protocol,
                auth_key,
                priv_protocol,
                priv_key,
            } => {
                require_non_empty(security_name, "security_name")?;
                require_pair(auth_protocol.is_some(), auth_key.is_some(), "auth_protocol", "auth_key")?;
                require_pair(priv_protocol.is_some(), priv_key.is_some(), "priv_protocol", "priv_key")?;
                for (key, field) in [(auth_key, "auth_key"), (priv_key, "priv_key")] {
                    if key.as_ref().is_some_and(|k| k.len() < MIN_USM_KEY_LEN) {
                        return Err(ModelError::InvalidCredential(format!(
                            "{field} must be at least {MIN_USM_KEY_LEN} characters"
                        )));
                    }
                }
                Ok(())
            }
            AccessParameters::NetconfSsh {
                user_name,
                password,
                key_path,
            } => {
                require_pair(user_name.is_some(), password.is_some(), "user_name", "password")?;
                if key_path.is_none() && user_name.is_none() {
                    return Err(ModelError::InvalidCredential(
                        "netconf_ssh needs either key_path or user_name and password".to_string(),
                    ));
                }
                Ok(())
            }
            AccessParameters::NetconfSoap { user_name, password } => {
                require_non_empty(user_name, "user_name")?;
                require_non_empty(password, "password")
            }
        }
    }
}

fn require_non_empty(value: &str, field: &str) -> Result<(), ModelError> {
    if value.trim().is_empty() {
        return Err(ModelError::InvalidCredential(format!("{field} must not be empty")));
    }
    Ok(())
}

fn require_pair(first: bool, second: bool, first_name: &str, second_name: &str) -> Result<(), ModelError> {
    if first != second {
        return Err(ModelError::InvalidCredential(format!(
            "{first_name} and {second_name} must be given together"
        )));
    }
    Ok(())
}

/// A stored credential record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Unique id
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    /// Unique name; switches may reference the credential by it
    pub name: String,

    /// Protocol variant and its parameters
    #[serde(flatten)]
    pub access: AccessParameters,
}

impl Credential {
    /// Protocol of the variant
    pub fn protocol(&self) -> ManagementProtocol {
        self.access.protocol()
    }

    /// Validate the record
    pub fn validate(&self) -> Result<(), ModelError> {
        require_non_empty(&self.name, "name")?;
        if Uuid::parse_str(self.name.trim()).is_ok() {
            return Err(ModelError::InvalidCredential(format!(
                "name {} looks like a UUID",
                self.name
            )));
        }
        self.access.validate()
    }
}

/// Address and access parameters a driver uses to reach one switch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCredentials {
    /// Management address of the switch
    pub ip_address: IpAddr,
    /// Resolved access parameters
    pub access: AccessParameters,
}

impl DeviceCredentials {
    /// Bundle an address with its parameters
    pub fn new(ip_address: IpAddr, access: AccessParameters) -> Self {
        Self { ip_address, access }
    }

    /// Protocol of the parameters
    pub fn protocol(&self) -> ManagementProtocol {
        self.access.protocol()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v3(auth: Option<(&str, &str)>, privacy: Option<(&str, &str)>) -> AccessParameters {
        AccessParameters::SnmpV3 {
            security_name: "bnp".to_string(),
            auth_protocol: auth.map(|(p, _)| p.parse().unwrap()),
            auth_key: auth.map(|(_, k)| k.to_string()),
            priv_protocol: privacy.map(|(p, _)| p.parse().unwrap()),
            priv_key: privacy.map(|(_, k)| k.to_string()),
        }
    }

    #[test]
    fn test_protocol_names_parse_case_insensitively() {
        assert_eq!("SNMPv2c".parse::<ManagementProtocol>().unwrap(), ManagementProtocol::SnmpV2c);
        assert_eq!("netconf-ssh".parse::<ManagementProtocol>().unwrap(), ManagementProtocol::NetconfSsh);
        assert!("telnet".parse::<ManagementProtocol>().is_err());
        assert_eq!("SHA1".parse::<AuthProtocol>().unwrap(), AuthProtocol::Sha);
        assert_eq!("des56".parse::<PrivProtocol>().unwrap(), PrivProtocol::Des);
        assert_eq!("aes".parse::<PrivProtocol>().unwrap(), PrivProtocol::Aes128);
    }

    #[test]
    fn test_every_snmp_version_maps_to_the_snmp_driver_protocol() {
        for protocol in [ManagementProtocol::SnmpV1, ManagementProtocol::SnmpV2c, ManagementProtocol::SnmpV3] {
            assert_eq!(protocol.driver_protocol(), "snmp");
        }
        assert_eq!(ManagementProtocol::NetconfSoap.driver_protocol(), "netconf_soap");
    }

    #[test]
    fn test_snmpv3_pairs_must_be_complete() {
        assert!(v3(None, None).validate().is_ok());
        assert!(v3(Some(("md5", "authpass1")), Some(("aes", "privpass1"))).validate().is_ok());

        let half = AccessParameters::SnmpV3 {
            security_name: "bnp".to_string(),
            auth_protocol: Some(AuthProtocol::Md5),
            auth_key: None,
            priv_protocol: None,
            priv_key: None,
        };
        assert!(half.validate().is_err());
        assert!(v3(Some(("sha", "short")), None).validate().is_err());
    }

    #[test]
    fn test_netconf_ssh_accepts_key_path_or_login() {
        let key = AccessParameters::NetconfSsh {
            user_name: None,
            password: None,
            key_path: Some("/etc/bnp/id_rsa".to_string()),
        };
        assert!(key.validate().is_ok());

        let user_only = AccessParameters::NetconfSsh {
            user_name: Some("admin".to_string()),
            password: None,
            key_path: None,
        };
        assert!(user_only.validate().is_err());

        let nothing = AccessParameters::NetconfSsh {
            user_name: None,
            password: None,
            key_path: None,
        };
        assert!(nothing.validate().is_err());
    }

    #[test]
    fn test_credential_names_must_not_look_like_ids() {
        let credential = Credential {
            id: Uuid::new_v4(),
            name: Uuid::new_v4().to_string(),
            access: AccessParameters::SnmpV2c {
                write_community: "private".to_string(),
            },
        };
        assert!(credential.validate().is_err());
    }

    #[test]
    fn test_credentials_deserialize_from_flat_yaml() {
        let yaml = r"
name: tor-v3
protocol_type: snmpv3
security_name: bnp
auth_protocol: SHA
auth_key: authpassword
priv_protocol: AES128
priv_key: privpassword
";
        let credential: Credential = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(credential.protocol(), ManagementProtocol::SnmpV3);
        match &credential.access {
            AccessParameters::SnmpV3 {
                auth_protocol,
                priv_protocol,
                ..
            } => {
                assert_eq!(*auth_protocol, Some(AuthProtocol::Sha));
                assert_eq!(*priv_protocol, Some(PrivProtocol::Aes128));
            }
            other => panic!("unexpected variant {other:?}"),
        }
        assert!(credential.validate().is_ok());
    }
}
