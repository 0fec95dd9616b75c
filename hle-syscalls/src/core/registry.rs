//! HLE module registry
//!
//! This module keeps the table of service modules and their exported
//! functions. Lookups are linear and the first registered module wins on a
//! name collision, so indices handed out at registration stay valid until the
//! registry is cleared.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::slice;

use hle_api::{Error, FuncIndex, ModuleIndex, Nid, Result};

use crate::core::encoding::{Opcode, MAX_FUNCTIONS, MAX_MODULES};
use crate::core::function::HleFunction;

/// Name reported for slots that do not exist
pub const UNKNOWN_FUNCTION: &str = "[unknown]";

/// Registration hook run against the registry at core init
pub type ModuleRegistrar = fn(&mut ModuleRegistry) -> Result<()>;

/// A named group of exported functions
#[derive(Debug, Clone)]
pub struct HleModule {
    /// Module name the guest imports by
    pub name: String,
    /// Exported functions, in table order
    pub functions: Vec<HleFunction>,
}

impl HleModule {
    /// Index of the function exporting `nid`
    pub fn func_index(&self, nid: Nid) -> Option<FuncIndex> {
        self.functions.iter().position(|f| f.nid == nid)
    }

    /// Function exporting `nid`
    pub fn function(&self, nid: Nid) -> Option<&HleFunction> {
        self.functions.iter().find(|f| f.nid == nid)
    }
}

/// Ordered table of registered modules
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: Vec<HleModule>,
}

impl ModuleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self { modules: Vec::new() }
    }

    /// Register a module
    ///
    /// Names are not deduplicated; a second module with an existing name is
    /// stored but shadowed by the first one in every lookup.
    pub fn register_module(&mut self, name: &str, functions: Vec<HleFunction>) -> Result<ModuleIndex> {
        if self.modules.len() >= MAX_MODULES {
            return Err(Error::InvalidArgument(format!(
                "cannot register {}: module table full ({} modules)",
                name, MAX_MODULES
            )));
        }
        if functions.len() > MAX_FUNCTIONS {
            return Err(Error::InvalidArgument(format!(
                "cannot register {}: {} functions exceed the limit of {}",
                name,
                functions.len(),
                MAX_FUNCTIONS
            )));
        }

        let index = self.modules.len();
        sys_debug!("registered module {} ({} functions) at {}", name, functions.len(), index);
        self.modules.push(HleModule {
            name: name.into(),
            functions,
        });
        Ok(index)
    }

    /// Index of the first module called `name`
    pub fn module_index(&self, name: &str) -> Option<ModuleIndex> {
        self.modules.iter().position(|m| m.name == name)
    }

    /// Index of `nid` inside the module at `module_index`
    pub fn func_index(&self, module_index: ModuleIndex, nid: Nid) -> Option<FuncIndex> {
        self.modules.get(module_index)?.func_index(nid)
    }

    /// Module by index
    pub fn module(&self, index: ModuleIndex) -> Option<&HleModule> {
        self.modules.get(index)
    }

    /// First module called `name`
    pub fn find_module(&self, name: &str) -> Option<&HleModule> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Function `nid` of module `name`
    pub fn find_function(&self, name: &str, nid: Nid) -> Option<&HleFunction> {
        self.find_module(name)?.function(nid)
    }

    /// Function at a decoded (module, function) index pair
    pub fn function_at(&self, module_index: ModuleIndex, func_index: FuncIndex) -> Option<&HleFunction> {
        self.modules.get(module_index)?.functions.get(func_index)
    }

    /// Display name of `nid` in module `name`, or a placeholder carrying the NID
    pub fn function_name(&self, name: &str, nid: Nid) -> String {
        match self.find_function(name, nid) {
            Some(func) => func.name.clone(),
            None => format!("[UNK: 0x{:08x}]", nid),
        }
    }

    /// Display name at a decoded index pair
    pub fn function_name_at(&self, module_index: ModuleIndex, func_index: FuncIndex) -> &str {
        self.function_at(module_index, func_index)
            .map_or(UNKNOWN_FUNCTION, |f| f.name.as_str())
    }

    /// NID of the function called `function_name` in module `name`
    pub fn nid_by_name(&self, name: &str, function_name: &str) -> Option<Nid> {
        self.find_module(name)?
            .functions
            .iter()
            .find(|f| f.name == function_name)
            .map(|f| f.nid)
    }

    /// Opcode a call site importing `nid` from `name` should carry
    pub fn syscall_op(&self, name: &str, nid: Nid) -> Opcode {
        let Some(module_index) = self.module_index(name) else {
            sys_error!("unknown module {} for syscall {:08x}", name, nid);
            return Opcode::unknown_module();
        };

        // MAX_MODULES and MAX_FUNCTIONS keep both indices in range.
        match self.func_index(module_index, nid) {
            Some(func_index) => Opcode::encode(module_index as u8, func_index as u16),
            None => {
                sys_info!("syscall {:08x} missing from module {}", nid, name);
                Opcode::encode_invalid(module_index as u8)
            }
        }
    }

    /// Drop every module
    pub fn clear(&mut self) {
        self.modules.clear();
    }

    /// Number of registered modules
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether no module is registered
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Modules in registration order
    pub fn iter(&self) -> slice::Iter<'_, HleModule> {
        self.modules.iter()
    }
}

impl<'a> IntoIterator for &'a ModuleRegistry {
    type Item = &'a HleModule;
    type IntoIter = slice::Iter<'a, HleModule>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
