use crate::parser::{impl_self_ident, FileParser, ParsedFile};
use crate::scanner::FileScanner;
use anyhow::Result;
use indexmap::IndexMap;
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Index of the types declared in a source tree.
///
/// Maps a type name to the file declaring it and, for each associated function,
/// the file holding the `impl` block. Names are bare identifiers; when two files
/// declare the same name the first one in path order wins.
///
/// Files that fail to parse are remembered with their text, so that a lookup
/// missing a type mentioned in one of them reports the parse error instead of
/// a plain miss.
#[derive(Debug, Default)]
pub struct SourceIndex {
    types: IndexMap<String, TypeEntry>,
    failed: IndexMap<PathBuf, String>,
}

#[derive(Debug, Default)]
struct TypeEntry {
    definition: Option<PathBuf>,
    methods: IndexMap<String, PathBuf>,
}

impl SourceIndex {
    /// Scans the roots and indexes every file that parses.
    ///
    /// Unparsable files are skipped with a warning and kept aside for
    /// [`SourceIndex::find_method`].
    pub fn build(parser: &FileParser, roots: &[PathBuf]) -> Result<Self> {
        let scan = FileScanner::new(roots.to_vec()).scan()?;
        debug!("Indexing {} Rust files", scan.rust_files.len());

        let mut index = Self::default();
        for path in &scan.rust_files {
            match parser.parse(path) {
                Ok(parsed) => index.add_file(&parsed),
                Err(e) => {
                    warn!("Skipping {}: {:#}", path.display(), e);
                    let text = fs::read_to_string(path).unwrap_or_default();
                    index.failed.insert(path.clone(), text);
                }
            }
        }

        debug!("Indexed {} types", index.types.len());
        Ok(index)
    }

    /// Adds the declarations of one parsed file
    pub fn add_file(&mut self, parsed: &ParsedFile) {
        self.add_items(&parsed.syntax_tree.items, &parsed.path);
    }

    fn add_items(&mut self, items: &[syn::Item], path: &Path) {
        for item in items {
            match item {
                syn::Item::Struct(s) => self.add_definition(s.ident.to_string(), path),
                syn::Item::Enum(e) => self.add_definition(e.ident.to_string(), path),
                syn::Item::Impl(item_impl) => {
                    let Some(name) = impl_self_ident(item_impl) else {
                        continue;
                    };
                    let entry = self.types.entry(name).or_default();
                    for impl_item in &item_impl.items {
                        if let syn::ImplItem::Fn(f) = impl_item {
                            entry
                                .methods
                                .entry(f.sig.ident.to_string())
                                .or_insert_with(|| path.to_path_buf());
                        }
                    }
                }
                syn::Item::Mod(syn::ItemMod {
                    content: Some((_, nested)),
                    ..
                }) => self.add_items(nested, path),
                _ => {}
            }
        }
    }

    fn add_definition(&mut self, name: String, path: &Path) {
        let entry = self.types.entry(name).or_default();
        match &entry.definition {
            Some(existing) if existing != path => {
                debug!(
                    "Type declared in both {} and {}, keeping the first",
                    existing.display(),
                    path.display()
                );
            }
            Some(_) => {}
            None => entry.definition = Some(path.to_path_buf()),
        }
    }

    /// File declaring the struct or enum `type_name`
    pub fn definition_file(&self, type_name: &str) -> Option<&Path> {
        self.types.get(type_name)?.definition.as_deref()
    }

    /// File holding `impl type_name { fn method }`
    pub fn method_file(&self, type_name: &str, method: &str) -> Option<&Path> {
        self.types.get(type_name)?.methods.get(method).map(PathBuf::as_path)
    }

    pub fn declares_method(&self, type_name: &str, method: &str) -> bool {
        self.method_file(type_name, method).is_some()
    }

    pub fn contains_type(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Locates and parses the `type_name::method` function node.
    ///
    /// `Ok(None)` when the type or method is unknown.
    ///
    /// # Errors
    ///
    /// Returns the parse error of a skipped file that mentions `type_name`
    /// when the method is not indexed, or any error from re-reading the file.
    pub fn find_method(
        &self,
        parser: &FileParser,
        type_name: &str,
        method: &str,
    ) -> Result<Option<(Rc<ParsedFile>, syn::ImplItemFn)>> {
        let Some(path) = self.method_file(type_name, method) else {
            return self.parse_failure(parser, type_name).map_or(Ok(None), Err);
        };
        let parsed = parser.parse(path)?;
        let node = parsed
            .find_method(&format!("{}@{}", type_name, method))
            .cloned();
        Ok(node.map(|node| (parsed, node)))
    }

    /// Error of the first skipped file mentioning `type_name`, parsed again
    fn parse_failure(&self, parser: &FileParser, type_name: &str) -> Option<anyhow::Error> {
        self.failed
            .iter()
            .filter(|(_, text)| text.contains(type_name))
            .find_map(|(path, _)| parser.parse(path).err())
    }

    /// Locates and parses the file declaring `type_name`
    pub fn definition(&self, parser: &FileParser, type_name: &str) -> Result<Option<Rc<ParsedFile>>> {
        match self.definition_file(type_name) {
            Some(path) => Ok(Some(parser.parse(path)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn build_index(files: &[(&str, &str)]) -> (TempDir, FileParser, SourceIndex) {
        let temp_dir = TempDir::new().unwrap();
        for (name, content) in files {
            let path = temp_dir.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }
        let parser = FileParser::new();
        let index = SourceIndex::build(&parser, &[temp_dir.path().to_path_buf()]).unwrap();
        (temp_dir, parser, index)
    }

    #[test]
    fn test_indexes_definitions_and_methods_across_files() {
        let (_dir, parser, index) = build_index(&[
            ("models.rs", "pub struct User { pub id: u64 }"),
            (
                "controllers/users.rs",
                "pub struct UserController; impl UserController { pub fn show(&self) {} }",
            ),
            ("requests.rs", "impl User { pub fn rules(&self) {} }"),
        ]);

        assert!(index.definition_file("User").unwrap().ends_with("models.rs"));
        assert!(index.method_file("User", "rules").unwrap().ends_with("requests.rs"));
        assert!(index.declares_method("UserController", "show"));
        assert!(!index.declares_method("UserController", "store"));

        let (parsed, node) = index.find_method(&parser, "UserController", "show").unwrap().unwrap();
        assert!(parsed.path.ends_with("controllers/users.rs"));
        assert_eq!(node.sig.ident, "show");
    }

    #[test]
    fn test_skips_unparsable_files() {
        let (_dir, _parser, index) = build_index(&[
            ("good.rs", "pub struct Good;"),
            ("bad.rs", "pub struct Bad {"),
        ]);

        assert!(index.contains_type("Good"));
        assert!(!index.contains_type("Bad"));
    }

    #[test]
    fn test_missed_lookup_reports_parse_error_of_candidate_file() {
        let (_dir, parser, index) = build_index(&[
            ("good.rs", "pub struct Good;"),
            (
                "controllers.rs",
                "pub struct OrderController; impl OrderController { pub fn index(&self) {",
            ),
        ]);

        let err = index.find_method(&parser, "OrderController", "index").unwrap_err();
        let location = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<crate::error::Error>())
            .and_then(crate::error::Error::location)
            .unwrap();
        assert!(location.contains("controllers.rs:"));

        // Types no broken file mentions are a plain miss
        assert!(index.find_method(&parser, "Good", "index").unwrap().is_none());
    }

    #[test]
    fn test_first_declaration_wins() {
        let (_dir, _parser, index) = build_index(&[
            ("a.rs", "pub struct Item;"),
            ("b.rs", "pub struct Item;"),
        ]);
        assert!(index.definition_file("Item").unwrap().ends_with("a.rs"));
    }

    #[test]
    fn test_unknown_method_is_none() {
        let (_dir, parser, index) = build_index(&[("a.rs", "pub struct Item;")]);
        assert!(index.find_method(&parser, "Item", "rules").unwrap().is_none());
        assert!(index.find_method(&parser, "Missing", "rules").unwrap().is_none());
    }
}
