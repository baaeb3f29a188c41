//! # STC Content Store
//!
//! Client-side content storage for the training-center website and its
//! in-browser admin console. Staff edit gallery images, articles, news,
//! service listings and trainer bios from the live site; everything is kept
//! in a per-origin key-value store as JSON, with no server in between.
//!
//! ## Pieces
//!
//! - [`content_store::ContentStore`]: typed whole-collection CRUD
//!   (`list`/`add`/`update`/`delete`/`replace_all`) and section documents.
//! - [`change_notifier`]: `subscribe(key, handler)` / `publish(key)`, so
//!   every mounted view of a key re-reads it after a write, in this tab or
//!   in another one.
//! - [`kv_backend`]: the storage seam. In-memory for tests, LMDB for durable
//!   native hosts, `localStorage` in the browser.
//! - [`section_editor`]: draft-then-save editing for the admin panels.
//! - [`admin_session`]: the `adminToken` gate in front of the admin UI.
//!
//! ## Quick Start
//!
//! ```no_run
//! use stc_content_store::content_model::ArticleDraft;
//! use stc_content_store::content_store::ContentStore;
//!
//! let store = ContentStore::in_memory();
//! let article = store.articles().add(ArticleDraft {
//!     title: "Tips Wawancara".to_string(),
//!     ..Default::default()
//! })?;
//! assert_eq!(store.articles().list(), vec![article]);
//! # Ok::<(), stc_content_store::store_error::StoreError>(())
//! ```
//!
//! ## FFI Functions
//!
//! Native hosts drive the store through C-compatible functions. Every call
//! returns a JSON [`AppResponse`](app_response::AppResponse) string that must
//! be released with [`free_response`].
//!
//! - [`create_store`] / [`open_store`] - Open a durable store
//! - [`list_items`], [`get_item`], [`add_item`], [`update_item`],
//!   [`delete_item`], [`replace_items`] - Collection CRUD
//!   (`"articles"`, `"news"`, `"gallery"`)
//! - [`load_section`] / [`save_section`] - Section documents
//! - [`admin_login`], [`admin_logout`], [`admin_is_authenticated`] - Admin gate
//! - [`close_store`] - Release the handle

pub mod admin_session;
pub mod app_response;
#[cfg(target_arch = "wasm32")]
pub mod browser_backend;
pub mod change_notifier;
pub mod content_model;
pub mod content_store;
pub mod kv_backend;
pub mod lmdb_backend;
pub mod section_editor;
pub mod store_config;
pub mod store_error;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use log::{info, warn};

use crate::admin_session::{CredentialAuthenticator, LoginOutcome};
use crate::app_response::AppResponse;
use crate::content_model::{
    keys, AboutContent, Article, ArticlesHeader, GalleryImage, NewsItem, Record, SectionDocument,
    ServicesContent, TrainersContent,
};
use crate::content_store::ContentStore;
use crate::store_config::StoreConfig;

/// Opaque handle owned by the FFI caller.
pub struct StoreHandle {
    store: ContentStore,
    authenticator: CredentialAuthenticator,
}

impl StoreHandle {
    pub fn open(config: &StoreConfig) -> Result<Self, AppResponse> {
        let store = ContentStore::open(config).map_err(AppResponse::from)?;
        Ok(Self {
            store,
            authenticator: CredentialAuthenticator::from_config(config),
        })
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }
}

macro_rules! for_collection {
    ($name:expr, $func:ident ( $($arg:expr),* )) => {
        match $name.as_str() {
            keys::ARTICLES => $func::<Article>($($arg),*),
            keys::NEWS => $func::<NewsItem>($($arg),*),
            keys::GALLERY => $func::<GalleryImage>($($arg),*),
            other => AppResponse::BadRequest(format!("Unknown collection: {other}")),
        }
    };
}

macro_rules! for_section {
    ($name:expr, $func:ident ( $($arg:expr),* )) => {
        match $name.as_str() {
            keys::ABOUT => $func::<AboutContent>($($arg),*),
            keys::SERVICES => $func::<ServicesContent>($($arg),*),
            keys::TRAINERS => $func::<TrainersContent>($($arg),*),
            keys::ARTICLES_HEADER => $func::<ArticlesHeader>($($arg),*),
            other => AppResponse::BadRequest(format!("Unknown section: {other}")),
        }
    };
}

/// Opens (creating if needed) `<name>.lmdb` in the working directory.
///
/// Returns a null pointer when the name is null, not UTF-8, or the store
/// cannot be opened. Admin login is disabled for stores opened this way;
/// use [`open_store`] to supply credentials.
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use stc_content_store::create_store;
///
/// let name = CString::new("stc_site").unwrap();
/// let handle = create_store(name.as_ptr());
/// assert!(!handle.is_null());
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_store(name: *const c_char) -> *mut StoreHandle {
    if name.is_null() {
        warn!("Null name pointer passed to create_store");
        return std::ptr::null_mut();
    }

    let name = match unsafe { CStr::from_ptr(name).to_str() } {
        Ok(s) => s,
        Err(e) => {
            warn!("Invalid UTF-8 in name parameter: {e}");
            return std::ptr::null_mut();
        }
    };

    open_handle(&StoreConfig::named(name))
}

/// Opens a store described by a JSON [`StoreConfig`].
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn open_store(config_json: *const c_char) -> *mut StoreHandle {
    if config_json.is_null() {
        warn!("Null config pointer passed to open_store");
        return std::ptr::null_mut();
    }

    let raw = match unsafe { CStr::from_ptr(config_json).to_str() } {
        Ok(s) => s,
        Err(e) => {
            warn!("Invalid UTF-8 in config parameter: {e}");
            return std::ptr::null_mut();
        }
    };

    match StoreConfig::from_json_str(raw) {
        Ok(config) => open_handle(&config),
        Err(e) => {
            warn!("Invalid store configuration: {e}");
            std::ptr::null_mut()
        }
    }
}

fn open_handle(config: &StoreConfig) -> *mut StoreHandle {
    match StoreHandle::open(config) {
        Ok(handle) => {
            info!("✅ Content store '{}' opened", config.name);
            Box::into_raw(Box::new(handle))
        }
        Err(e) => {
            warn!("❌ Failed to open content store '{}': {}", config.name, e);
            std::ptr::null_mut()
        }
    }
}

/// Lists a collection as a JSON array (empty when nothing usable is stored).
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn list_items(
    handle: *mut StoreHandle,
    collection: *const c_char,
) -> *const c_char {
    let handle = match handle_ref(handle, "list_items") {
        Ok(h) => h,
        Err(err) => return err,
    };
    let collection = match c_ptr_to_string(collection, "collection") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let response = for_collection!(collection, list_json(&handle.store));
    response_to_c_string(&response)
}

/// Fetches one row by id.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_item(
    handle: *mut StoreHandle,
    collection: *const c_char,
    id: *const c_char,
) -> *const c_char {
    let handle = match handle_ref(handle, "get_item") {
        Ok(h) => h,
        Err(err) => return err,
    };
    let collection = match c_ptr_to_string(collection, "collection") {
        Ok(s) => s,
        Err(err) => return err,
    };
    let id = match c_ptr_to_string(id, "id") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let response = for_collection!(collection, get_json(&handle.store, &id));
    response_to_c_string(&response)
}

/// Adds a row from its draft JSON; the response carries the stored row with
/// its generated `id` and `createdAt`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn add_item(
    handle: *mut StoreHandle,
    collection: *const c_char,
    json_ptr: *const c_char,
) -> *const c_char {
    let handle = match handle_ref(handle, "add_item") {
        Ok(h) => h,
        Err(err) => return err,
    };
    let collection = match c_ptr_to_string(collection, "collection") {
        Ok(s) => s,
        Err(err) => return err,
    };
    let json = match c_ptr_to_string(json_ptr, "JSON") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let response = for_collection!(collection, add_json(&handle.store, &json));
    response_to_c_string(&response)
}

/// Applies a JSON patch to the row with `id`. `NotFound` leaves storage untouched.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn update_item(
    handle: *mut StoreHandle,
    collection: *const c_char,
    id: *const c_char,
    json_ptr: *const c_char,
) -> *const c_char {
    let handle = match handle_ref(handle, "update_item") {
        Ok(h) => h,
        Err(err) => return err,
    };
    let collection = match c_ptr_to_string(collection, "collection") {
        Ok(s) => s,
        Err(err) => return err,
    };
    let id = match c_ptr_to_string(id, "id") {
        Ok(s) => s,
        Err(err) => return err,
    };
    let json = match c_ptr_to_string(json_ptr, "JSON") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let response = for_collection!(collection, update_json(&handle.store, &id, &json));
    response_to_c_string(&response)
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn delete_item(
    handle: *mut StoreHandle,
    collection: *const c_char,
    id: *const c_char,
) -> *const c_char {
    let handle = match handle_ref(handle, "delete_item") {
        Ok(h) => h,
        Err(err) => return err,
    };
    let collection = match c_ptr_to_string(collection, "collection") {
        Ok(s) => s,
        Err(err) => return err,
    };
    let id = match c_ptr_to_string(id, "id") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let response = for_collection!(collection, delete_json(&handle.store, &id));
    response_to_c_string(&response)
}

/// Overwrites a collection with the given JSON array of full rows.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn replace_items(
    handle: *mut StoreHandle,
    collection: *const c_char,
    json_ptr: *const c_char,
) -> *const c_char {
    let handle = match handle_ref(handle, "replace_items") {
        Ok(h) => h,
        Err(err) => return err,
    };
    let collection = match c_ptr_to_string(collection, "collection") {
        Ok(s) => s,
        Err(err) => return err,
    };
    let json = match c_ptr_to_string(json_ptr, "JSON") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let response = for_collection!(collection, replace_json(&handle.store, &json));
    response_to_c_string(&response)
}

/// Section document under `key`, or its fallback content.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn load_section(handle: *mut StoreHandle, key: *const c_char) -> *const c_char {
    let handle = match handle_ref(handle, "load_section") {
        Ok(h) => h,
        Err(err) => return err,
    };
    let key = match c_ptr_to_string(key, "key") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let response = for_section!(key, load_section_json(&handle.store));
    response_to_c_string(&response)
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn save_section(
    handle: *mut StoreHandle,
    key: *const c_char,
    json_ptr: *const c_char,
) -> *const c_char {
    let handle = match handle_ref(handle, "save_section") {
        Ok(h) => h,
        Err(err) => return err,
    };
    let key = match c_ptr_to_string(key, "key") {
        Ok(s) => s,
        Err(err) => return err,
    };
    let json = match c_ptr_to_string(json_ptr, "JSON") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let response = for_section!(key, save_section_json(&handle.store, &json));
    response_to_c_string(&response)
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn admin_login(
    handle: *mut StoreHandle,
    username: *const c_char,
    password: *const c_char,
) -> *const c_char {
    let handle = match handle_ref(handle, "admin_login") {
        Ok(h) => h,
        Err(err) => return err,
    };
    let username = match c_ptr_to_string(username, "username") {
        Ok(s) => s,
        Err(err) => return err,
    };
    let password = match c_ptr_to_string(password, "password") {
        Ok(s) => s,
        Err(err) => return err,
    };

    let session = handle.store.session(handle.authenticator.clone());
    let response = match session.login(&username, &password) {
        Ok(LoginOutcome::Granted) => AppResponse::success("Logged in"),
        Ok(LoginOutcome::Denied) => {
            AppResponse::BadRequest("Invalid username or password".to_string())
        }
        Err(e) => AppResponse::from(e),
    };
    response_to_c_string(&response)
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn admin_logout(handle: *mut StoreHandle) -> *const c_char {
    let handle = match handle_ref(handle, "admin_logout") {
        Ok(h) => h,
        Err(err) => return err,
    };

    let session = handle.store.session(handle.authenticator.clone());
    let response = match session.logout() {
        Ok(()) => AppResponse::success("Logged out"),
        Err(e) => AppResponse::from(e),
    };
    response_to_c_string(&response)
}

/// `Ok("true")` or `Ok("false")`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn admin_is_authenticated(handle: *mut StoreHandle) -> *const c_char {
    let handle = match handle_ref(handle, "admin_is_authenticated") {
        Ok(h) => h,
        Err(err) => return err,
    };

    let session = handle.store.session(handle.authenticator.clone());
    let response = AppResponse::success(session.is_authenticated().to_string());
    response_to_c_string(&response)
}

/// Releases a handle returned by [`create_store`] or [`open_store`]. The
/// LMDB environment closes when the handle drops.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn close_store(handle: *mut StoreHandle) -> *const c_char {
    if handle.is_null() {
        let error =
            AppResponse::BadRequest("Null handle pointer passed to close_store".to_string());
        return response_to_c_string(&error);
    }

    drop(unsafe { Box::from_raw(handle) });
    let success = AppResponse::success("Content store closed successfully");
    response_to_c_string(&success)
}

/// Frees a response string returned by any function of this library.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn free_response(ptr: *const c_char) {
    if ptr.is_null() {
        return;
    }
    drop(unsafe { CString::from_raw(ptr as *mut c_char) });
}

fn list_json<T: Record>(store: &ContentStore) -> AppResponse {
    match serde_json::to_string(&store.collection::<T>().list()) {
        Ok(json) => AppResponse::Ok(json),
        Err(e) => AppResponse::from(e),
    }
}

fn get_json<T: Record>(store: &ContentStore, id: &str) -> AppResponse {
    match store.collection::<T>().get(id) {
        Some(item) => match serde_json::to_string(&item) {
            Ok(json) => AppResponse::Ok(json),
            Err(e) => AppResponse::from(e),
        },
        None => AppResponse::NotFound(format!("No item with id {id} in {}", T::KEY)),
    }
}

fn add_json<T: Record>(store: &ContentStore, json: &str) -> AppResponse {
    let draft: T::Draft = match serde_json::from_str(json) {
        Ok(draft) => draft,
        Err(e) => return AppResponse::SerializationError(format!("Invalid JSON: {e}")),
    };
    match store.collection::<T>().add(draft) {
        Ok(item) => match serde_json::to_string(&item) {
            Ok(json) => AppResponse::Ok(json),
            Err(e) => AppResponse::from(e),
        },
        Err(e) => AppResponse::from(e),
    }
}

fn update_json<T: Record>(store: &ContentStore, id: &str, json: &str) -> AppResponse {
    let patch: T::Patch = match serde_json::from_str(json) {
        Ok(patch) => patch,
        Err(e) => return AppResponse::SerializationError(format!("Invalid JSON: {e}")),
    };
    match store.collection::<T>().update(id, patch) {
        Ok(Some(item)) => match serde_json::to_string(&item) {
            Ok(json) => AppResponse::Ok(json),
            Err(e) => AppResponse::from(e),
        },
        Ok(None) => AppResponse::NotFound(format!("No item with id {id} in {}", T::KEY)),
        Err(e) => AppResponse::from(e),
    }
}

fn delete_json<T: Record>(store: &ContentStore, id: &str) -> AppResponse {
    match store.collection::<T>().delete(id) {
        Ok(true) => AppResponse::success("Item deleted successfully"),
        Ok(false) => AppResponse::NotFound(format!("No item with id {id} in {}", T::KEY)),
        Err(e) => AppResponse::from(e),
    }
}

fn replace_json<T: Record>(store: &ContentStore, json: &str) -> AppResponse {
    let items: Vec<T> = match serde_json::from_str(json) {
        Ok(items) => items,
        Err(e) => return AppResponse::SerializationError(format!("Invalid JSON: {e}")),
    };
    match store.collection::<T>().replace_all(&items) {
        Ok(()) => AppResponse::success(format!("{} now holds {} item(s)", T::KEY, items.len())),
        Err(e) => AppResponse::from(e),
    }
}

fn load_section_json<D: SectionDocument>(store: &ContentStore) -> AppResponse {
    match serde_json::to_string(&store.load_document::<D>()) {
        Ok(json) => AppResponse::Ok(json),
        Err(e) => AppResponse::from(e),
    }
}

fn save_section_json<D: SectionDocument>(store: &ContentStore, json: &str) -> AppResponse {
    let document: D = match serde_json::from_str(json) {
        Ok(document) => document,
        Err(e) => return AppResponse::SerializationError(format!("Invalid JSON: {e}")),
    };
    match store.save_document(&document) {
        Ok(()) => AppResponse::success(format!("{} saved", D::KEY)),
        Err(e) => AppResponse::from(e),
    }
}

fn handle_ref<'a>(
    handle: *mut StoreHandle,
    caller: &str,
) -> Result<&'a StoreHandle, *const c_char> {
    match unsafe { handle.as_ref() } {
        Some(h) => Ok(h),
        None => {
            let error = AppResponse::BadRequest(format!("Null handle pointer passed to {caller}"));
            Err(response_to_c_string(&error))
        }
    }
}

/// Serializes `response` into a caller-owned C string; null if that fails.
fn response_to_c_string(response: &AppResponse) -> *const c_char {
    let json = match serde_json::to_string(response) {
        Ok(j) => j,
        Err(e) => {
            warn!("Error serializing response: {e}");
            return std::ptr::null();
        }
    };

    match CString::new(json) {
        Ok(c_str) => c_str.into_raw(),
        Err(e) => {
            warn!("Error creating CString: {e}");
            std::ptr::null()
        }
    }
}

/// Converts a C string pointer to an owned `String`, or an error response
/// naming `field_name`.
fn c_ptr_to_string(ptr: *const c_char, field_name: &str) -> Result<String, *const c_char> {
    if ptr.is_null() {
        let error = AppResponse::BadRequest(format!("Null {field_name} pointer"));
        return Err(response_to_c_string(&error));
    }

    match unsafe { CStr::from_ptr(ptr).to_str() } {
        Ok(s) => Ok(s.to_string()),
        Err(e) => {
            let error = AppResponse::BadRequest(format!("Invalid UTF-8 in {field_name}: {e}"));
            Err(response_to_c_string(&error))
        }
    }
}
