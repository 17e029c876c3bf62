//! In-memory source model.
//!
//! A complete, serde-backed implementation of `SourceModel` for adapters that
//! produce a JSON dump of their parse results, and for tests. It performs no
//! I/O; callers hand it a document they already read.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{ConfigError, SourceError};
use crate::source::model::{
    CompilationUnit, Directive, LoadedUnit, PackageReference, SourceModel, SymbolInfo,
    SymbolResolver, SyntaxNode, UnitHandle,
};

/// Resolver backed by lookup tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapResolver {
    /// Symbols keyed by `NodeId` value.
    #[serde(default)]
    pub nodes: BTreeMap<u32, SymbolInfo>,
    /// Type name → direct base type name.
    #[serde(default)]
    pub bases: BTreeMap<String, String>,
    /// Type name → directly implemented interfaces.
    #[serde(default)]
    pub interfaces: BTreeMap<String, Vec<String>>,
}

impl MapResolver {
    pub fn with_symbol(mut self, id: u32, namespace: &str, type_name: &str) -> Self {
        self.nodes.insert(
            id,
            SymbolInfo {
                declared_type: type_name.to_string(),
                containing_namespace: namespace.to_string(),
            },
        );
        self
    }

    pub fn with_base(mut self, type_name: &str, base: &str) -> Self {
        self.bases.insert(type_name.to_string(), base.to_string());
        self
    }

    pub fn with_interfaces(mut self, type_name: &str, interfaces: &[&str]) -> Self {
        self.interfaces.insert(
            type_name.to_string(),
            interfaces.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    fn lookup<'a, T>(table: &'a BTreeMap<String, T>, type_name: &str) -> Option<&'a T> {
        table.get(type_name).or_else(|| {
            let simple = type_name.rsplit('.').next()?;
            table.get(simple)
        })
    }
}

impl SymbolResolver for MapResolver {
    fn resolve(&self, node: &SyntaxNode) -> Option<SymbolInfo> {
        let id = node.id?;
        self.nodes.get(&id.0).cloned()
    }

    fn base_type(&self, type_name: &str) -> Option<String> {
        Self::lookup(&self.bases, type_name).cloned()
    }

    fn interfaces(&self, type_name: &str) -> Vec<String> {
        Self::lookup(&self.interfaces, type_name)
            .cloned()
            .unwrap_or_default()
    }
}

/// One unit of an in-memory model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryUnit {
    pub path: String,
    pub root: SyntaxNode,
    #[serde(default)]
    pub directives: Vec<Directive>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbols: Option<MapResolver>,
    /// When set, loading this unit fails with the given reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unreadable: Option<String>,
}

impl MemoryUnit {
    pub fn new(path: impl Into<String>, root: SyntaxNode) -> Self {
        Self {
            path: path.into(),
            root,
            directives: Vec::new(),
            symbols: None,
            unreadable: None,
        }
    }

    pub fn with_directive(mut self, line: u32, text: &str) -> Self {
        self.directives.push(Directive {
            line,
            text: text.to_string(),
        });
        self
    }

    pub fn with_symbols(mut self, symbols: MapResolver) -> Self {
        self.symbols = Some(symbols);
        self
    }

    pub fn unreadable(mut self, reason: &str) -> Self {
        self.unreadable = Some(reason.to_string());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemorySourceModel {
    pub source_id: String,
    #[serde(default)]
    pub units: Vec<MemoryUnit>,
    #[serde(default)]
    pub packages: Vec<PackageReference>,
    /// When set, enumeration fails and the run is fatal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unavailable: Option<String>,
}

impl InMemorySourceModel {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            ..Default::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_unit(mut self, unit: MemoryUnit) -> Self {
        self.units.push(unit);
        self
    }

    pub fn with_package(mut self, name: &str, version: Option<&str>, declared_in: &str) -> Self {
        self.packages.push(PackageReference {
            name: name.to_string(),
            version: version.map(str::to_string),
            declared_in: declared_in.to_string(),
            line: 1,
        });
        self
    }
}

impl SourceModel for InMemorySourceModel {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn enumerate(&self) -> Result<Vec<UnitHandle>, SourceError> {
        if let Some(reason) = &self.unavailable {
            return Err(SourceError::Unavailable {
                reason: reason.clone(),
            });
        }
        Ok(self
            .units
            .iter()
            .map(|u| UnitHandle {
                path: u.path.clone(),
            })
            .collect())
    }

    fn load(&self, handle: &UnitHandle) -> Result<LoadedUnit, SourceError> {
        let unit = self
            .units
            .iter()
            .find(|u| u.path == handle.path)
            .ok_or_else(|| SourceError::Unreadable {
                path: handle.path.clone(),
                reason: "unit not present in model".to_string(),
            })?;

        if let Some(reason) = &unit.unreadable {
            return Err(SourceError::Unreadable {
                path: unit.path.clone(),
                reason: reason.clone(),
            });
        }

        Ok(LoadedUnit {
            unit: CompilationUnit {
                path: unit.path.clone(),
                root: unit.root.clone(),
                directives: unit.directives.clone(),
            },
            resolver: unit
                .symbols
                .clone()
                .map(|s| Arc::new(s) as Arc<dyn SymbolResolver>),
        })
    }

    fn package_references(&self) -> Vec<PackageReference> {
        self.packages.clone()
    }
}
