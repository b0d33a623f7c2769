//! Document library backed by `lopdf`.
//!
//! Pages are appended by deep-copying the page object and everything it
//! references into the composite document. Object ids are remapped per
//! source document so objects shared between pages of one source (fonts,
//! images, resource dictionaries) are copied only once.

use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use super::{DocumentLibrary, FieldKind, FormField, LibraryError, PdfDocument};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_PAGE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Form dictionary entries carried from a source form into the composite.
const CARRIED_FORM_KEYS: [&[u8]; 3] = [b"DA", b"DR", b"NeedAppearances"];

/// Guards walks up page and field trees against reference cycles.
const MAX_TREE_DEPTH: usize = 64;

static NEXT_DOCUMENT_KEY: AtomicU64 = AtomicU64::new(1);

impl From<lopdf::Error> for LibraryError {
    fn from(err: lopdf::Error) -> Self {
        Self::Structure(err.to_string())
    }
}

/// Document library producing [`LopdfDocument`]s.
#[derive(Debug, Clone)]
pub struct LopdfLibrary {
    compress: bool,
}

impl LopdfLibrary {
    /// Create a library that compresses documents when saving.
    pub fn new() -> Self {
        Self { compress: true }
    }

    /// Create a library with explicit compression behavior.
    pub fn with_compression(compress: bool) -> Self {
        Self { compress }
    }
}

impl Default for LopdfLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentLibrary for LopdfLibrary {
    type Document = LopdfDocument;

    fn load(&self, bytes: &[u8]) -> Result<LopdfDocument, LibraryError> {
        let document = Document::load_mem(bytes).map_err(|e| {
            let err_msg = e.to_string();
            if err_msg.contains("encrypt") || err_msg.contains("password") {
                LibraryError::parse(format!("PDF is encrypted and cannot be processed: {err_msg}"))
            } else {
                LibraryError::parse(err_msg)
            }
        })?;

        Ok(LopdfDocument::wrap(document, self.compress))
    }

    fn new_empty(&self) -> LopdfDocument {
        let mut document = Document::with_version("1.7");

        let pages_id = document.add_object(dictionary! {
            "Type" => Object::Name(b"Pages".to_vec()),
            "Kids" => Object::Array(Vec::new()),
            "Count" => Object::Integer(0),
        });
        let catalog_id = document.add_object(dictionary! {
            "Type" => Object::Name(b"Catalog".to_vec()),
            "Pages" => Object::Reference(pages_id),
        });
        document.trailer.set("Root", Object::Reference(catalog_id));

        LopdfDocument::wrap(document, self.compress)
    }
}

/// Where the catalog keeps its interactive form.
enum FormLocation {
    Indirect(ObjectId),
    Inline,
}

/// A `lopdf` document lent by [`LopdfLibrary`].
#[derive(Debug)]
pub struct LopdfDocument {
    document: Document,
    /// Identity used to key object-id remapping tables.
    key: u64,
    /// Source object id to composite object id, per source document.
    imports: HashMap<u64, BTreeMap<ObjectId, ObjectId>>,
    compress: bool,
}

impl LopdfDocument {
    fn wrap(document: Document, compress: bool) -> Self {
        Self {
            document,
            key: NEXT_DOCUMENT_KEY.fetch_add(1, Ordering::Relaxed),
            imports: HashMap::new(),
            compress,
        }
    }

    /// Borrow the underlying `lopdf` document.
    pub fn inner(&self) -> &Document {
        &self.document
    }

    fn pages_root_id(&self) -> Result<ObjectId, LibraryError> {
        self.document
            .catalog()
            .and_then(|catalog| catalog.get(b"Pages"))
            .and_then(Object::as_reference)
            .map_err(|e| LibraryError::structure(format!("Failed to get pages reference: {e}")))
    }

    /// Look up `key` on the ancestors of `page`.
    fn inherited_attribute(&self, page: ObjectId, key: &[u8]) -> Option<Object> {
        let mut current = self.document.get_dictionary(page).ok()?;
        for _ in 0..MAX_TREE_DEPTH {
            let parent_id = current.get(b"Parent").and_then(Object::as_reference).ok()?;
            current = self.document.get_dictionary(parent_id).ok()?;
            if let Ok(value) = current.get(key) {
                return Some(value.clone());
            }
        }
        None
    }

    fn push_kid(&mut self, pages_root: ObjectId, page_id: ObjectId) -> Result<(), LibraryError> {
        let pages_dict = self
            .document
            .get_dictionary_mut(pages_root)
            .map_err(|e| LibraryError::structure(format!("Failed to get pages object: {e}")))?;

        pages_dict
            .get_mut(b"Kids")
            .and_then(Object::as_array_mut)
            .map_err(|_| LibraryError::structure("Pages dictionary missing Kids array"))?
            .push(Object::Reference(page_id));

        let current_count = pages_dict.get(b"Count").and_then(Object::as_i64).unwrap_or(0);
        pages_dict.set("Count", Object::Integer(current_count + 1));

        Ok(())
    }

    fn form_location(&self) -> Option<FormLocation> {
        match self.document.catalog().ok()?.get(b"AcroForm").ok()? {
            Object::Reference(id) => Some(FormLocation::Indirect(*id)),
            Object::Dictionary(_) => Some(FormLocation::Inline),
            _ => None,
        }
    }

    fn form_dictionary(&self) -> Option<&Dictionary> {
        let form = self.document.catalog().ok()?.get(b"AcroForm").ok()?;
        resolve(&self.document, form).as_dict().ok()
    }

    fn form_dictionary_mut(&mut self) -> Option<&mut Dictionary> {
        match self.form_location()? {
            FormLocation::Indirect(id) => self.document.get_dictionary_mut(id).ok(),
            FormLocation::Inline => self
                .document
                .catalog_mut()
                .ok()?
                .get_mut(b"AcroForm")
                .ok()?
                .as_dict_mut()
                .ok(),
        }
    }

    /// Return the form dictionary, creating an empty one if needed.
    fn ensure_form(&mut self) -> Result<&mut Dictionary, LibraryError> {
        if self.form_location().is_none() {
            let form_id = self.document.add_object(dictionary! {
                "Fields" => Object::Array(Vec::new()),
            });
            self.document
                .catalog_mut()?
                .set("AcroForm", Object::Reference(form_id));
        }

        let form = self
            .form_dictionary_mut()
            .ok_or_else(|| LibraryError::structure("AcroForm is not a dictionary"))?;
        if !form.has(b"Fields") {
            form.set("Fields", Object::Array(Vec::new()));
        }
        Ok(form)
    }

    fn fields_array_mut(&mut self) -> Option<&mut Vec<Object>> {
        let fields_ref = self
            .form_dictionary()?
            .get(b"Fields")
            .ok()
            .and_then(|fields| fields.as_reference().ok());

        match fields_ref {
            Some(id) => self.document.get_object_mut(id).ok()?.as_array_mut().ok(),
            None => self
                .form_dictionary_mut()?
                .get_mut(b"Fields")
                .ok()?
                .as_array_mut()
                .ok(),
        }
    }

    fn field_entries(&self) -> Option<Vec<ObjectId>> {
        let form = self.form_dictionary()?;
        let entries = match form.get(b"Fields") {
            Ok(fields) => resolve(&self.document, fields)
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| item.as_reference().ok())
                        .collect()
                })
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        };
        Some(entries)
    }

    fn classify_field(&self, field: &Dictionary) -> FieldKind {
        if let Ok(field_type) = field.get(b"FT").and_then(Object::as_name) {
            return FieldKind::from_field_type(field_type);
        }
        if field.has(b"Kids") {
            FieldKind::NonTerminal
        } else {
            FieldKind::Unknown
        }
    }

    /// Widget annotations belonging to a field and its descendants.
    fn widget_annotations(&self, field: ObjectId) -> Vec<ObjectId> {
        let mut widgets = Vec::new();
        let mut pending = vec![(field, 0usize)];

        while let Some((id, depth)) = pending.pop() {
            let Ok(dict) = self.document.get_dictionary(id) else {
                continue;
            };
            if dict.get(b"Subtype").and_then(Object::as_name).ok() == Some(b"Widget".as_slice()) {
                widgets.push(id);
            }
            if depth >= MAX_TREE_DEPTH {
                continue;
            }
            if let Ok(kids) = dict
                .get(b"Kids")
                .map(|kids| resolve(&self.document, kids))
                .and_then(Object::as_array)
            {
                pending.extend(
                    kids.iter()
                        .filter_map(|kid| kid.as_reference().ok())
                        .map(|kid| (kid, depth + 1)),
                );
            }
        }

        widgets
    }

    fn remove_annotations(&mut self, widgets: &[ObjectId]) {
        if widgets.is_empty() {
            return;
        }

        for page_id in self.pages() {
            let annots_ref = self
                .document
                .get_dictionary(page_id)
                .ok()
                .and_then(|page| page.get(b"Annots").ok())
                .and_then(|annots| annots.as_reference().ok());

            let annots = match annots_ref {
                Some(id) => self
                    .document
                    .get_object_mut(id)
                    .ok()
                    .and_then(|annots| annots.as_array_mut().ok()),
                None => self
                    .document
                    .get_dictionary_mut(page_id)
                    .ok()
                    .and_then(|page| page.get_mut(b"Annots").ok())
                    .and_then(|annots| annots.as_array_mut().ok()),
            };

            if let Some(annots) = annots {
                annots.retain(|annot| {
                    annot
                        .as_reference()
                        .map(|id| !widgets.contains(&id))
                        .unwrap_or(true)
                });
            }
        }
    }
}

impl PdfDocument for LopdfDocument {
    type Page = ObjectId;
    type FieldId = ObjectId;

    fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    fn pages(&self) -> Vec<ObjectId> {
        self.document.get_pages().into_values().collect()
    }

    fn append_page(&mut self, source: &Self, page: &ObjectId) -> Result<(), LibraryError> {
        let pages_root = self.pages_root_id()?;

        let mut page_dict = source
            .document
            .get_dictionary(*page)
            .map_err(|e| LibraryError::structure(format!("Failed to get page object: {e}")))?
            .clone();

        for key in INHERITABLE_PAGE_KEYS {
            if !page_dict.has(key)
                && let Some(value) = source.inherited_attribute(*page, key)
            {
                page_dict.set(key.to_vec(), value);
            }
        }
        page_dict.remove(b"Parent");

        let mut map = self.imports.remove(&source.key).unwrap_or_default();
        let new_id = match map.get(page) {
            Some(&id) => id,
            None => {
                let id = self.document.new_object_id();
                map.insert(*page, id);
                id
            }
        };

        let mut copied = rewrite_dictionary(&mut self.document, &mut map, &source.document, &page_dict);
        copied.set("Parent", Object::Reference(pages_root));
        self.document.objects.insert(new_id, Object::Dictionary(copied));
        self.imports.insert(source.key, map);

        self.push_kid(pages_root, new_id)
    }

    fn adopt_form(&mut self, source: &Self) -> Result<(), LibraryError> {
        let Some(source_form) = source.form_dictionary() else {
            return Ok(());
        };
        let field_ids = source.field_entries().unwrap_or_default();
        let source_sig_flags = source_form.get(b"SigFlags").and_then(Object::as_i64).ok();

        let mut map = self.imports.remove(&source.key).unwrap_or_default();

        let imported: Vec<Object> = field_ids
            .into_iter()
            .map(|id| {
                Object::Reference(import_reference(
                    &mut self.document,
                    &mut map,
                    &source.document,
                    id,
                ))
            })
            .collect();

        let carried: Vec<(&[u8], Object)> = CARRIED_FORM_KEYS
            .iter()
            .filter_map(|key| {
                let value = source_form.get(key).ok()?.clone();
                Some((
                    *key,
                    rewrite_object(&mut self.document, &mut map, &source.document, value),
                ))
            })
            .collect();

        self.imports.insert(source.key, map);

        let form = self.ensure_form()?;
        for (key, value) in carried {
            if !form.has(key) {
                form.set(key.to_vec(), value);
            }
        }
        if let Some(flags) = source_sig_flags {
            let current = form.get(b"SigFlags").and_then(Object::as_i64).unwrap_or(0);
            form.set("SigFlags", Object::Integer(current | flags));
        }

        self.fields_array_mut()
            .ok_or_else(|| LibraryError::structure("AcroForm Fields is not an array"))?
            .extend(imported);

        Ok(())
    }

    fn title(&self) -> Option<String> {
        let info = self.document.trailer.get(b"Info").ok()?;
        let info = resolve(&self.document, info).as_dict().ok()?;
        match resolve(&self.document, info.get(b"Title").ok()?) {
            Object::String(bytes, _) => Some(decode_text_string(bytes)),
            _ => None,
        }
    }

    fn form_fields(&self) -> Option<Vec<FormField<ObjectId>>> {
        let fields = self
            .field_entries()?
            .into_iter()
            .filter_map(|id| {
                let dict = self.document.get_dictionary(id).ok()?;
                let name = match dict.get(b"T").map(|t| resolve(&self.document, t)) {
                    Ok(Object::String(bytes, _)) => Some(decode_text_string(bytes)),
                    _ => None,
                };
                Some(FormField {
                    id,
                    name,
                    kind: self.classify_field(dict),
                })
            })
            .collect();

        Some(fields)
    }

    fn remove_field(&mut self, id: &ObjectId) -> Result<bool, LibraryError> {
        let widgets = self.widget_annotations(*id);

        let removed = match self.fields_array_mut() {
            Some(fields) => {
                let before = fields.len();
                fields.retain(|field| field.as_reference().ok() != Some(*id));
                fields.len() != before
            }
            None => false,
        };

        if removed {
            self.remove_annotations(&widgets);

            let signatures_left = self
                .form_fields()
                .is_some_and(|fields| fields.iter().any(|f| f.kind.is_signature()));
            if !signatures_left && let Some(form) = self.form_dictionary_mut() {
                form.remove(b"SigFlags");
            }
        }

        Ok(removed)
    }

    fn detach_form(&mut self) {
        if let Ok(catalog) = self.document.catalog_mut() {
            catalog.remove(b"AcroForm");
        }
    }

    fn save(&mut self) -> Result<Vec<u8>, LibraryError> {
        self.document.prune_objects();
        if self.compress {
            self.document.compress();
        }

        let mut buffer = Vec::new();
        self.document.save_to(&mut buffer)?;
        Ok(buffer)
    }
}

fn resolve<'a>(document: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => document.get_object(*id).unwrap_or(object),
        _ => object,
    }
}

/// Copy `id` from `source` into `target`, returning its id in `target`.
fn import_reference(
    target: &mut Document,
    map: &mut BTreeMap<ObjectId, ObjectId>,
    source: &Document,
    id: ObjectId,
) -> ObjectId {
    if let Some(&mapped) = map.get(&id) {
        return mapped;
    }

    let new_id = target.new_object_id();
    map.insert(id, new_id);

    let object = source.get_object(id).cloned().unwrap_or(Object::Null);
    let object = rewrite_object(target, map, source, object);
    target.objects.insert(new_id, object);

    new_id
}

fn rewrite_object(
    target: &mut Document,
    map: &mut BTreeMap<ObjectId, ObjectId>,
    source: &Document,
    object: Object,
) -> Object {
    match object {
        Object::Reference(id) => Object::Reference(import_reference(target, map, source, id)),
        Object::Array(items) => Object::Array(
            items
                .into_iter()
                .map(|item| rewrite_object(target, map, source, item))
                .collect(),
        ),
        Object::Dictionary(dict) => {
            Object::Dictionary(rewrite_dictionary(target, map, source, &dict))
        }
        Object::Stream(mut stream) => {
            let dict = std::mem::take(&mut stream.dict);
            stream.dict = rewrite_dictionary(target, map, source, &dict);
            Object::Stream(stream)
        }
        other => other,
    }
}

/// Rewrite references in `dict`. Page tree nodes lose their `Parent` so
/// copying a page never drags the source page tree along.
fn rewrite_dictionary(
    target: &mut Document,
    map: &mut BTreeMap<ObjectId, ObjectId>,
    source: &Document,
    dict: &Dictionary,
) -> Dictionary {
    let is_page_node = matches!(
        dict.get(b"Type").and_then(Object::as_name),
        Ok(b"Page") | Ok(b"Pages")
    );

    let mut rewritten = Dictionary::new();
    for (key, value) in dict.iter() {
        if is_page_node && key.as_slice() == b"Parent" {
            continue;
        }
        rewritten.set(
            key.clone(),
            rewrite_object(target, map, source, value.clone()),
        );
    }
    rewritten
}

/// Decode a PDF text string (UTF-16BE with BOM, UTF-8 with BOM, or bytes).
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(utf8) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(utf8).into_owned();
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
