//! Point-of-interest categories and their source feeds.
//!
//! A phenotype file names the categories and the sub-tags each one
//! recognizes; one CSV feed per category carries the member coordinates.
//! Rows whose sub-tag is not recognized fold into the category's
//! `others_<name>` bucket. A missing feed is fatal at startup.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::geo::GeoCoord;

/// One point-of-interest class: its members (real-world coordinates) and
/// per-sub-tag bookkeeping. Immutable after loading.
#[derive(Debug, Clone)]
pub struct Category {
    pub name: String,
    pub members: Vec<GeoCoord>,
    /// Member count per sub-tag bucket (including `others_<name>`).
    pub bucket_counts: BTreeMap<String, usize>,
}

impl Category {
    /// Build a category directly from member coordinates (tests, fixtures).
    pub fn from_members(name: &str, members: Vec<GeoCoord>) -> Self {
        let mut bucket_counts = BTreeMap::new();
        bucket_counts.insert(format!("others_{name}"), members.len());
        Self {
            name: name.to_string(),
            members,
            bucket_counts,
        }
    }
}

/// The ordered, immutable set of categories for a run. The order defines
/// the meaning of every weight vector.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    categories: Vec<Category>,
}

#[derive(Debug, Deserialize)]
struct Phenotype {
    categories: Vec<PhenotypeCategory>,
}

#[derive(Debug, Deserialize)]
struct PhenotypeCategory {
    name: String,
    #[serde(default)]
    subtags: Vec<String>,
}

impl CategoryTable {
    pub fn from_categories(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    /// Load the phenotype file and every category feed under `data_dir`.
    ///
    /// Expects `data_dir/phenotype.json` and one `data_dir/<name>.csv` per
    /// category, with a `names,x,y` header (`x` = longitude, `y` =
    /// latitude). Rows with an empty `x` field are skipped, matching the
    /// source feeds which carry tag-only rows.
    pub fn load(data_dir: &Path) -> Result<Self, CategoryError> {
        let phenotype_path = data_dir.join("phenotype.json");
        if !phenotype_path.is_file() {
            return Err(CategoryError::MissingPhenotype(phenotype_path));
        }
        let phenotype: Phenotype = serde_json::from_slice(&fs::read(&phenotype_path)?)?;

        let mut categories = Vec::with_capacity(phenotype.categories.len());
        for entry in &phenotype.categories {
            let name = entry.name.to_lowercase();
            let feed_path = data_dir.join(format!("{name}.csv"));
            if !feed_path.is_file() {
                return Err(CategoryError::MissingFeed {
                    category: name,
                    path: feed_path,
                });
            }
            let accepted: Vec<String> = entry.subtags.iter().map(|s| s.to_lowercase()).collect();
            categories.push(parse_feed(&feed_path, &name, &accepted)?);
        }
        Ok(Self { categories })
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn names(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.name.clone()).collect()
    }
}

fn parse_feed(path: &Path, name: &str, accepted: &[String]) -> Result<Category, CategoryError> {
    let text = fs::read_to_string(path)?;
    let mut lines = text.lines().enumerate();

    let (_, header) = lines.next().ok_or_else(|| CategoryError::Malformed {
        path: path.to_path_buf(),
        line: 1,
        message: "empty feed".to_string(),
    })?;
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();
    let col = |wanted: &str| {
        columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CategoryError::Malformed {
                path: path.to_path_buf(),
                line: 1,
                message: format!("missing column {wanted:?}"),
            })
    };
    let names_col = col("names")?;
    let x_col = col("x")?;
    let y_col = col("y")?;

    let other_bucket = format!("others_{name}");
    let mut members = Vec::new();
    let mut bucket_counts: BTreeMap<String, usize> = BTreeMap::new();

    for (idx, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let field = |col: usize| fields.get(col).copied().unwrap_or("");

        // Tag-only rows carry no coordinates.
        if field(x_col).is_empty() {
            continue;
        }
        let lon: f64 = field(x_col)
            .parse()
            .map_err(|_| CategoryError::Malformed {
                path: path.to_path_buf(),
                line: idx + 1,
                message: format!("bad x value {:?}", field(x_col)),
            })?;
        let lat: f64 = field(y_col)
            .parse()
            .map_err(|_| CategoryError::Malformed {
                path: path.to_path_buf(),
                line: idx + 1,
                message: format!("bad y value {:?}", field(y_col)),
            })?;

        let sub_tag = field(names_col).to_lowercase();
        let bucket = if accepted.contains(&sub_tag) {
            sub_tag
        } else {
            other_bucket.clone()
        };
        *bucket_counts.entry(bucket).or_insert(0) += 1;
        members.push(GeoCoord::new(lat, lon));
    }

    Ok(Category {
        name: name.to_string(),
        members,
        bucket_counts,
    })
}

/// Errors raised while loading category data.
#[derive(Debug)]
pub enum CategoryError {
    /// The phenotype file naming the categories is absent.
    MissingPhenotype(PathBuf),
    /// A required category feed is absent.
    MissingFeed { category: String, path: PathBuf },
    /// A feed exists but cannot be parsed.
    Malformed {
        path: PathBuf,
        line: usize,
        message: String,
    },
    Io(io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for CategoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryError::MissingPhenotype(path) => {
                write!(f, "phenotype file not found: {}", path.display())
            }
            CategoryError::MissingFeed { category, path } => write!(
                f,
                "missing feed for category {category:?}: {}",
                path.display()
            ),
            CategoryError::Malformed {
                path,
                line,
                message,
            } => write!(f, "malformed feed {} line {line}: {message}", path.display()),
            CategoryError::Io(e) => write!(f, "I/O error reading category data: {e}"),
            CategoryError::Json(e) => write!(f, "invalid phenotype file: {e}"),
        }
    }
}

impl std::error::Error for CategoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CategoryError::Io(e) => Some(e),
            CategoryError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CategoryError {
    fn from(e: io::Error) -> Self {
        CategoryError::Io(e)
    }
}

impl From<serde_json::Error> for CategoryError {
    fn from(e: serde_json::Error) -> Self {
        CategoryError::Json(e)
    }
}
