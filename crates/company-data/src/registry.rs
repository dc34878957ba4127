use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use valuation_core::{CompanyModel, CompanyOption};

use crate::error::{DatasetError, DatasetResult};
use crate::validation::validate;

/// Datasets compiled into the binary, as (file name, JSON)
pub const BUILTIN_DATASETS: &[(&str, &str)] = &[("msft.json", include_str!("../data/msft.json"))];

/// Parse and validate one company dataset. Symbols are upper-cased.
pub fn parse_company(name: &str, json: &str) -> DatasetResult<CompanyModel> {
    let mut company: CompanyModel = serde_json::from_str(json).map_err(|source| DatasetError::Parse {
        name: name.to_string(),
        source,
    })?;
    company.symbol = company.symbol.trim().to_uppercase();
    validate(&company)?;
    Ok(company)
}

/// Load every `*.json` file in `dir`, in file-name order.
pub fn load_directory(dir: &Path) -> DatasetResult<Vec<CompanyModel>> {
    let entries = std::fs::read_dir(dir).map_err(|source| DatasetError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DatasetError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut companies = Vec::with_capacity(paths.len());
    for path in paths {
        let json = std::fs::read_to_string(&path).map_err(|source| DatasetError::Io {
            path: path.clone(),
            source,
        })?;
        let company = parse_company(&path.display().to_string(), &json)?;
        tracing::debug!(symbol = %company.symbol, path = %path.display(), "Loaded company dataset");
        companies.push(company);
    }

    Ok(companies)
}

/// Catalog of company datasets, shared read-only across callers
#[derive(Debug, Clone)]
pub struct CompanyRegistry {
    companies: BTreeMap<String, Arc<CompanyModel>>,
    /// Catalog order for pickers
    order: Vec<String>,
    default_symbol: String,
}

impl CompanyRegistry {
    /// Build from datasets in catalog order. The first company is the
    /// default unless `default_symbol` names another one.
    pub fn new(companies: Vec<CompanyModel>, default_symbol: Option<&str>) -> DatasetResult<Self> {
        let mut map = BTreeMap::new();
        let mut order = Vec::with_capacity(companies.len());

        for company in companies {
            let symbol = company.symbol.to_uppercase();
            if map.insert(symbol.clone(), Arc::new(company)).is_some() {
                return Err(DatasetError::DuplicateSymbol(symbol));
            }
            order.push(symbol);
        }

        let default_symbol = match default_symbol {
            Some(s) => {
                let s = s.trim().to_uppercase();
                if !map.contains_key(&s) {
                    return Err(DatasetError::UnknownSymbol(s));
                }
                s
            }
            None => order.first().cloned().ok_or(DatasetError::Empty)?,
        };

        Ok(Self {
            companies: map,
            order,
            default_symbol,
        })
    }

    pub fn builtin() -> DatasetResult<Self> {
        let companies = BUILTIN_DATASETS
            .iter()
            .map(|(name, json)| parse_company(name, json))
            .collect::<DatasetResult<Vec<_>>>()?;
        Self::new(companies, None)
    }

    /// Built-in datasets plus every dataset in `data_dir`. A directory
    /// dataset replaces a built-in one with the same symbol.
    pub fn load(data_dir: Option<&Path>, default_symbol: Option<&str>) -> DatasetResult<Self> {
        let mut companies = BUILTIN_DATASETS
            .iter()
            .map(|(name, json)| parse_company(name, json))
            .collect::<DatasetResult<Vec<_>>>()?;

        if let Some(dir) = data_dir {
            for company in load_directory(dir)? {
                match companies.iter_mut().find(|c| c.symbol == company.symbol) {
                    Some(existing) => {
                        tracing::info!(symbol = %company.symbol, "Replacing built-in dataset");
                        *existing = company;
                    }
                    None => companies.push(company),
                }
            }
        }

        let registry = Self::new(companies, default_symbol)?;
        tracing::info!(
            companies = registry.len(),
            default = %registry.default_symbol,
            "Company registry loaded"
        );
        Ok(registry)
    }

    pub fn get(&self, symbol: &str) -> Option<Arc<CompanyModel>> {
        self.companies.get(&symbol.trim().to_uppercase()).cloned()
    }

    pub fn require(&self, symbol: &str) -> DatasetResult<Arc<CompanyModel>> {
        self.get(symbol)
            .ok_or_else(|| DatasetError::UnknownSymbol(symbol.trim().to_uppercase()))
    }

    pub fn options(&self) -> Vec<CompanyOption> {
        self.order
            .iter()
            .filter_map(|symbol| self.companies.get(symbol))
            .map(|c| CompanyOption {
                symbol: c.symbol.clone(),
                name: c.name.clone(),
            })
            .collect()
    }

    pub fn default_symbol(&self) -> &str {
        &self.default_symbol
    }

    pub fn len(&self) -> usize {
        self.companies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }
}
