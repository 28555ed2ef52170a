use super::super::Model;
use gloo_file::File as GlooFile;
use gloo_timers::callback::Timeout;
use js_sys::Date;
use shared::ActionResult;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use web_sys::{Event, FileList, HtmlInputElement};
use yew::prelude::*;

pub fn generate_id() -> u64 {
    static ID_COUNTER: AtomicU64 = AtomicU64::new(0);
    let now = Date::now() as u64;
    let count = ID_COUNTER.fetch_add(1, Ordering::SeqCst);
    now * 1000 + (count % 1000)
}

// Debounce function to limit button events
pub fn debounce<F>(duration: u32, callback: F) -> Callback<MouseEvent>
where
    F: Fn() + Clone + 'static,
{
    let timeout = Rc::new(RefCell::new(None::<Timeout>));

    Callback::from(move |_| {
        let mut timeout_ref = timeout.borrow_mut();

        if let Some(old_timeout) = timeout_ref.take() {
            old_timeout.cancel();
        }

        let inner_callback = callback.clone();
        *timeout_ref = Some(Timeout::new(duration, move || inner_callback()));
    })
}

pub fn extract_image_files(file_list: &FileList) -> Vec<GlooFile> {
    (0..file_list.length())
        .filter_map(|i| file_list.item(i))
        .filter(|file| {
            let is_image = file.type_().starts_with("image/");
            if !is_image {
                log::warn!("Skipping non-image file: {}", file.name());
            }
            is_image
        })
        .map(GlooFile::from)
        .collect()
}

/// Image files picked in an `<input type="file">`; clears the input so the
/// same selection fires `change` again.
pub fn take_picked_images(e: &Event) -> Vec<GlooFile> {
    let input: HtmlInputElement = e.target_unchecked_into();
    let files = input.files().as_ref().map(extract_image_files).unwrap_or_default();
    input.set_value("");
    files
}

pub fn render_error_message(model: &Model) -> Html {
    if let Some(error_msg) = &model.error {
        html! {
            <div class="error-message">
                <i class="fa-solid fa-circle-exclamation"></i>
                <p>{ error_msg }</p>
            </div>
        }
    } else {
        html! {}
    }
}

pub fn render_action_result(result: Option<&ActionResult>) -> Html {
    match result {
        Some(ActionResult { ok: true, message, .. }) => html! {
            <p class="action-result ok">
                <i class="fa-solid fa-check"></i>{ format!(" {}", message.as_deref().unwrap_or("Done")) }
            </p>
        },
        Some(ActionResult { error, .. }) => html! {
            <p class="action-result failed">
                <i class="fa-solid fa-circle-exclamation"></i>
                { format!(" {}", error.as_deref().unwrap_or("Request failed")) }
            </p>
        },
        None => html! {},
    }
}

pub fn spinner_label(busy: bool, busy_text: &str, idle: Html) -> Html {
    if busy {
        html! { <><i class="fa-solid fa-spinner fa-spin"></i>{ format!(" {}", busy_text) }</> }
    } else {
        idle
    }
}
