//! Interactive form (AcroForm) field extraction using lopdf

use std::collections::{HashMap, HashSet};
use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Field trees deeper than this are cut off. Real forms nest a handful of levels.
const MAX_DEPTH: usize = 64;

/// Kind of a form field, from its `/FT` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// Push button, checkbox or radio button (`/Btn`)
    Button,
    /// Text box (`/Tx`)
    Text,
    /// List box or combo box (`/Ch`)
    Choice,
    /// Digital signature (`/Sig`)
    Signature,
    /// Any other field type name
    Other(String),
}

impl FieldType {
    fn from_name(name: &[u8]) -> Self {
        match name {
            b"Btn" => FieldType::Button,
            b"Tx" => FieldType::Text,
            b"Ch" => FieldType::Choice,
            b"Sig" => FieldType::Signature,
            other => FieldType::Other(String::from_utf8_lossy(other).into_owned()),
        }
    }
}

/// One named field of a document's interactive form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    /// Fully qualified name, e.g. `address.city`
    pub name: String,
    /// The field's own `/T` entry
    pub partial_name: String,
    /// Field type, inherited from the nearest ancestor that sets it
    pub field_type: Option<FieldType>,
    /// Current value when it is a string or a name
    pub value: Option<String>,
}

/// The form fields of one document, keyed by fully qualified name.
///
/// Iteration follows document order. Names are unique: the first node that
/// produces a given name is kept.
#[derive(Debug, Clone, Default)]
pub struct FormFields {
    fields: Vec<FormField>,
    index: HashMap<String, usize>,
}

impl FormFields {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field. Returns `false` if a field with that name already exists.
    pub fn insert(&mut self, field: FormField) -> bool {
        if self.index.contains_key(&field.name) {
            return false;
        }
        self.index.insert(field.name.clone(), self.fields.len());
        self.fields.push(field);
        true
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the form lists no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look a field up by its fully qualified name
    pub fn get(&self, name: &str) -> Option<&FormField> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    /// Field names in document order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Fields in document order
    pub fn iter(&self) -> std::slice::Iter<'_, FormField> {
        self.fields.iter()
    }
}

impl<'a> IntoIterator for &'a FormFields {
    type Item = &'a FormField;
    type IntoIter = std::slice::Iter<'a, FormField>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Read the form fields of a PDF file
///
/// Returns `Ok(None)` when the document has no interactive form at all, and
/// an empty mapping when the form exists but lists no fields.
///
/// # Example
///
/// ```no_run
/// use pdf_form_fields::pdf::read_form_fields;
/// use std::path::Path;
///
/// if let Some(fields) = read_form_fields(Path::new("application.pdf"))? {
///     for name in fields.names() {
///         println!("{}", name);
///     }
/// }
/// # Ok::<(), pdf_form_fields::Error>(())
/// ```
pub fn read_form_fields(path: &Path) -> Result<Option<FormFields>> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    debug!(path = %path.display(), "loading document");
    let doc = Document::load(path)?;

    fields_from_document(&doc)
}

/// Read the form fields of an already loaded document
pub fn fields_from_document(doc: &Document) -> Result<Option<FormFields>> {
    let catalog_ref = doc.trailer.get(b"Root")
        .map_err(|_| Error::General("No Root in trailer".to_string()))?;

    let catalog = match resolve(doc, catalog_ref)? {
        Object::Dictionary(dict) => dict,
        _ => return Err(Error::General("Catalog is not a dictionary".to_string())),
    };

    let acroform = match catalog.get(b"AcroForm") {
        Ok(obj) => obj,
        Err(_) => {
            debug!("document has no AcroForm");
            return Ok(None);
        }
    };

    let acroform = match resolve(doc, acroform)? {
        Object::Dictionary(dict) => dict,
        Object::Null => return Ok(None),
        _ => return Err(Error::InvalidForm("AcroForm is not a dictionary".to_string())),
    };

    let mut walker = FieldWalker::new(doc);

    if let Ok(fields) = acroform.get(b"Fields") {
        let fields = match resolve(doc, fields)? {
            Object::Array(items) => items,
            _ => return Err(Error::InvalidForm("Fields is not an array".to_string())),
        };

        let root = Inherited::default();
        for item in fields {
            walker.walk(item, &root, 0);
        }
    } else {
        debug!("AcroForm has no Fields entry");
    }

    debug!(count = walker.fields.len(), "collected form fields");
    Ok(Some(walker.fields))
}

/// Follow a chain of references down to a direct object
///
/// Looks objects up one hop at a time so that chains longer than
/// `MAX_DEPTH` are rejected here rather than followed.
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Result<&'a Object> {
    let mut current = obj;
    let mut hops = 0;

    while let Object::Reference(id) = current {
        if hops >= MAX_DEPTH {
            return Err(Error::InvalidForm(format!(
                "reference chain through {} {} R is too long",
                id.0, id.1
            )));
        }
        current = doc.objects.get(id).ok_or_else(|| {
            Error::InvalidForm(format!("object {} {} R not found", id.0, id.1))
        })?;
        hops += 1;
    }

    Ok(current)
}

/// Entries a field passes down to its kids
#[derive(Debug, Default)]
struct Inherited {
    prefix: Option<String>,
    field_type: Option<FieldType>,
    value: Option<String>,
}

struct FieldWalker<'a> {
    doc: &'a Document,
    visited: HashSet<ObjectId>,
    fields: FormFields,
}

impl<'a> FieldWalker<'a> {
    fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            visited: HashSet::new(),
            fields: FormFields::new(),
        }
    }

    /// Visit one entry of a `/Fields` or `/Kids` array
    ///
    /// Malformed entries are logged and skipped so that one broken node does
    /// not hide the rest of the form.
    fn walk(&mut self, node: &Object, parent: &Inherited, depth: usize) {
        if depth >= MAX_DEPTH {
            warn!(depth, "field tree too deep, not descending further");
            return;
        }

        if let Object::Reference(id) = node {
            if !self.visited.insert(*id) {
                warn!(object = ?id, "field tree revisits an object, skipping");
                return;
            }
        }

        let dict = match resolve(self.doc, node) {
            Ok(Object::Dictionary(dict)) => dict,
            Ok(other) => {
                warn!(kind = object_kind(other), "form field is not a dictionary, skipping");
                return;
            }
            Err(e) => {
                warn!(error = %e, "cannot resolve form field, skipping");
                return;
            }
        };

        let partial_name = text_entry(self.doc, dict, b"T");
        let field_type = name_entry(self.doc, dict, b"FT")
            .map(|ft| FieldType::from_name(&ft))
            .or_else(|| parent.field_type.clone());
        let value = value_entry(self.doc, dict).or_else(|| parent.value.clone());

        let name = match (&parent.prefix, &partial_name) {
            (Some(prefix), Some(partial)) => Some(format!("{}.{}", prefix, partial)),
            (None, Some(partial)) => Some(partial.clone()),
            (prefix, None) => prefix.clone(),
        };

        if let (Some(name), Some(partial)) = (&name, &partial_name) {
            let field = FormField {
                name: name.clone(),
                partial_name: partial.clone(),
                field_type: field_type.clone(),
                value: value.clone(),
            };
            if !self.fields.insert(field) {
                debug!(name = %name, "duplicate field name, keeping the first");
            }
        }

        let kids = match dict.get(b"Kids") {
            Ok(kids) => kids,
            Err(_) => return,
        };
        let kids = match resolve(self.doc, kids) {
            Ok(Object::Array(kids)) => kids,
            Ok(_) => {
                warn!(name = ?name, "Kids is not an array, skipping");
                return;
            }
            Err(e) => {
                warn!(name = ?name, error = %e, "cannot resolve Kids, skipping");
                return;
            }
        };

        let inherited = Inherited {
            prefix: name,
            field_type,
            value,
        };
        for kid in kids {
            self.walk(kid, &inherited, depth + 1);
        }
    }
}

fn object_kind(obj: &Object) -> &'static str {
    match obj {
        Object::Null => "null",
        Object::Boolean(_) => "boolean",
        Object::Integer(_) | Object::Real(_) => "number",
        Object::Name(_) => "name",
        Object::String(..) => "string",
        Object::Array(_) => "array",
        Object::Dictionary(_) => "dictionary",
        Object::Stream(_) => "stream",
        Object::Reference(_) => "reference",
    }
}

fn text_entry(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<String> {
    match resolve(doc, dict.get(key).ok()?).ok()? {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        _ => None,
    }
}

fn name_entry(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<Vec<u8>> {
    match resolve(doc, dict.get(key).ok()?).ok()? {
        Object::Name(name) => Some(name.clone()),
        _ => None,
    }
}

fn value_entry(doc: &Document, dict: &Dictionary) -> Option<String> {
    match resolve(doc, dict.get(b"V").ok()?).ok()? {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

/// Decode a PDF text string
///
/// UTF-16BE when the bytes carry the `FE FF` byte order mark, UTF-8 with the
/// `EF BB BF` mark, otherwise one char per byte (PDFDocEncoding agrees with
/// Latin-1 for everything that shows up in field names).
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE_u8, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair.get(1).copied().unwrap_or(0)]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    if let Some(utf8) = bytes.strip_prefix(&[0xEF_u8, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(utf8).into_owned();
    }

    bytes.iter().map(|&b| b as char).collect()
}
