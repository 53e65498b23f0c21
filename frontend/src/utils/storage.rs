use web_sys::{Storage, Window};

pub fn window() -> Result<Window, String> {
    web_sys::window().ok_or_else(|| "No window object".to_string())
}

pub fn local_storage() -> Result<Storage, String> {
    window()?
        .local_storage()
        .map_err(|_| "No localStorage".to_string())?
        .ok_or_else(|| "No localStorage".to_string())
}

pub fn access_token() -> Option<String> {
    local_storage()
        .ok()?
        .get_item("access_token")
        .ok()
        .flatten()
        .filter(|token| !token.trim().is_empty())
}

pub fn clear_session() {
    if let Ok(storage) = local_storage() {
        let _ = storage.remove_item("access_token");
        let _ = storage.remove_item("refresh_token");
        let _ = storage.remove_item("current_user");
    }
}
