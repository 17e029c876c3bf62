//! Engine, filter and rule-catalog configuration.
//!
//! All values arrive already parsed. Every struct is `#[serde(default)]`, so a
//! partial JSON document overrides only the fields it names.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::finding::Severity;

/// How the engine schedules registered rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One rule at a time, in registration order.
    #[default]
    Sequential,
    /// One task per rule; output is merged back in registration order.
    Concurrent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Findings weaker than this are dropped.
    pub min_severity: Severity,
    /// Path patterns; a finding whose file matches any of them is dropped.
    pub exclude_patterns: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_severity: Severity::Info,
            exclude_patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub mode: ExecutionMode,
    /// Emit an Info finding for every unit that could not be loaded.
    pub unit_advisories: bool,
    pub filter: FilterConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Sequential,
            unit_advisories: true,
            filter: FilterConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A type identified by namespace and simple name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRef {
    pub namespace: String,
    pub name: String,
}

impl TypeRef {
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

/// A package that should be replaced, with its suggested successor.
///
/// A trailing `*` in `name` makes it a case-insensitive prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannedPackage {
    pub name: String,
    pub replacement: String,
}

impl BannedPackage {
    pub fn new(name: &str, replacement: &str) -> Self {
        Self {
            name: name.to_string(),
            replacement: replacement.to_string(),
        }
    }

    pub fn matches(&self, package: &str) -> bool {
        match self.name.strip_suffix('*') {
            Some(prefix) => package
                .to_ascii_lowercase()
                .starts_with(&prefix.to_ascii_lowercase()),
            None => package.eq_ignore_ascii_case(&self.name),
        }
    }
}

/// Regular expressions used by string-literal rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiteralPatterns {
    pub absolute_path: String,
    pub unc_path: String,
    pub relative_backslash_path: String,
    pub password_in_connection_string: String,
    pub integrated_security: String,
    /// Values matching any of these are never reported by path rules.
    pub safe_paths: Vec<String>,
}

impl Default for LiteralPatterns {
    fn default() -> Self {
        Self {
            absolute_path: r"^[A-Za-z]:[\\/]".to_string(),
            unc_path: r"^\\\\[^\\/\s]+[\\/][^\\/\s]+".to_string(),
            relative_backslash_path: r"^[A-Za-z0-9_.\-]+(\\[A-Za-z0-9_.\-]+)+\\?$".to_string(),
            password_in_connection_string: r"(?i)(^|;)\s*(password|pwd)\s*=\s*[^;\s]+"
                .to_string(),
            integrated_security:
                r"(?i)integrated\s+security\s*=\s*(sspi|true|yes)|trusted_connection\s*=\s*(true|yes)"
                    .to_string(),
            safe_paths: vec![
                r"(?i)^[a-z][a-z0-9+.\-]*://".to_string(),
                r"^[A-Za-z0-9_.\-]+(/[A-Za-z0-9_.\-]+)*/?$".to_string(),
            ],
        }
    }
}

/// Tables that drive the built-in rule catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub windows_namespaces: Vec<String>,
    pub legacy_namespaces: Vec<String>,
    pub pinvoke_attributes: Vec<String>,
    pub native_libraries: Vec<String>,
    pub windows_types: Vec<TypeRef>,
    pub identity_types: Vec<TypeRef>,
    pub legacy_config_types: Vec<TypeRef>,
    pub directive_tokens: Vec<String>,
    pub platform_base_types: Vec<String>,
    pub com_attributes: Vec<String>,
    pub legacy_service_attributes: Vec<String>,
    pub windows_env_vars: Vec<String>,
    pub banned_packages: Vec<BannedPackage>,
    pub in_memory_session_markers: Vec<String>,
    pub persistent_store_markers: Vec<String>,
    pub literals: LiteralPatterns,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            windows_namespaces: strings(&[
                "Microsoft.Win32",
                "System.Management",
                "System.Windows.Forms",
                "System.DirectoryServices",
                "System.ServiceProcess",
                "System.Drawing.Printing",
                "Microsoft.VisualBasic.Devices",
            ]),
            legacy_namespaces: strings(&[
                "System.Web",
                "System.ServiceModel",
                "System.Runtime.Remoting",
                "System.EnterpriseServices",
            ]),
            pinvoke_attributes: strings(&["DllImport", "LibraryImport"]),
            native_libraries: strings(&[
                "kernel32", "user32", "advapi32", "gdi32", "ntdll", "ole32", "oleaut32",
                "shell32", "comctl32", "comdlg32", "winmm", "ws2_32", "secur32", "crypt32",
                "netapi32", "wininet", "winhttp", "psapi", "dbghelp", "iphlpapi", "setupapi",
                "userenv", "wtsapi32", "shlwapi", "version", "msvcrt",
            ]),
            windows_types: vec![
                TypeRef::new("Microsoft.Win32", "Registry"),
                TypeRef::new("Microsoft.Win32", "RegistryKey"),
                TypeRef::new("System.Diagnostics", "EventLog"),
                TypeRef::new("System.Diagnostics", "PerformanceCounter"),
                TypeRef::new("System.Management", "ManagementObjectSearcher"),
                TypeRef::new("System.Management", "ManagementObject"),
                TypeRef::new("System.Management", "ManagementClass"),
            ],
            identity_types: vec![
                TypeRef::new("System.Security.Principal", "WindowsIdentity"),
                TypeRef::new("System.Security.Principal", "WindowsPrincipal"),
                TypeRef::new("System.Security.Principal", "WindowsImpersonationContext"),
            ],
            legacy_config_types: vec![
                TypeRef::new("System.Configuration", "ConfigurationManager"),
                TypeRef::new("System.Web.Configuration", "WebConfigurationManager"),
            ],
            directive_tokens: strings(&["WINDOWS", "WIN32", "WIN64", "NETFRAMEWORK", "NET4"]),
            platform_base_types: strings(&[
                "System.ServiceProcess.ServiceBase",
                "System.Windows.Forms.Form",
                "System.Windows.Forms.UserControl",
                "System.Web.UI.Page",
                "System.Web.HttpApplication",
                "System.Web.IHttpModule",
            ]),
            com_attributes: strings(&[
                "ComVisible",
                "ComImport",
                "ClassInterface",
                "ComDefaultInterface",
                "ProgId",
            ]),
            legacy_service_attributes: strings(&[
                "WebMethod",
                "WebService",
                "ServiceContract",
                "OperationContract",
            ]),
            windows_env_vars: strings(&[
                "APPDATA",
                "LOCALAPPDATA",
                "PROGRAMFILES",
                "PROGRAMFILES(X86)",
                "PROGRAMDATA",
                "SYSTEMROOT",
                "SYSTEMDRIVE",
                "WINDIR",
                "USERPROFILE",
                "TEMP",
                "TMP",
                "COMSPEC",
                "HOMEDRIVE",
                "HOMEPATH",
            ]),
            banned_packages: vec![
                BannedPackage::new("Microsoft.AspNet.Mvc", "Microsoft.AspNetCore.Mvc"),
                BannedPackage::new("Microsoft.AspNet.WebApi*", "ASP.NET Core controllers"),
                BannedPackage::new("Microsoft.Owin*", "ASP.NET Core middleware"),
                BannedPackage::new("EntityFramework", "Microsoft.EntityFrameworkCore"),
                BannedPackage::new("WindowsAzure.Storage", "Azure.Storage.Blobs"),
                BannedPackage::new(
                    "Microsoft.Practices.EnterpriseLibrary*",
                    "Microsoft.Extensions.* equivalents",
                ),
                BannedPackage::new("System.Web.*", "ASP.NET Core packages"),
            ],
            in_memory_session_markers: strings(&["AddSession", "AddDistributedMemoryCache"]),
            persistent_store_markers: strings(&[
                "AddStackExchangeRedisCache",
                "AddDistributedRedisCache",
                "AddDistributedSqlServerCache",
                "AddCosmosCache",
            ]),
            literals: LiteralPatterns::default(),
        }
    }
}

impl CatalogConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}
