use std::fmt::Write as _;

use axum::{
    extract::State,
    http::StatusCode,
    response::Html,
    Form,
};
use serde::Deserialize;
use tracing::warn;

use inventory_core::draft::{DraftForm, ValidationPolicy};
use inventory_core::page::PageState;
use inventory_core::types::Product;

use crate::problem::ProblemResponse;
use crate::products::{create_product, load_products};
use crate::router::AppState;

/// Fields posted by the create form. `cart` holds the comma-separated ids of
/// the cart entries so the cart survives the round trip.
#[derive(Debug, Default, Deserialize)]
pub struct CreateForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    price: String,
    #[serde(default)]
    inventory: String,
    #[serde(default)]
    cart: String,
}

/// Fields posted by the add and remove buttons.
#[derive(Debug, Default, Deserialize)]
pub struct CartForm {
    #[serde(default)]
    cart: String,
    add: Option<String>,
    remove: Option<usize>,
}

/// `GET /`: the product list is read from the store before the page is rendered.
pub async fn index(State(state): State<AppState>) -> Result<Html<String>, ProblemResponse> {
    let products = load_products(&state, "page").await?;
    Ok(Html(render_page(&PageState::new(products))))
}

/// `POST /`: submits the create form, then re-renders with the refreshed list.
///
/// A rejected draft is rendered back with its banner and the status of the
/// rejection.
pub async fn submit(
    State(state): State<AppState>,
    Form(form): Form<CreateForm>,
) -> Result<(StatusCode, Html<String>), ProblemResponse> {
    let mut page = restore_page(&state, &form.cart).await?;
    page.update_draft(|draft| {
        *draft = DraftForm {
            name: form.name,
            description: form.description,
            price: form.price,
            inventory: form.inventory,
        }
    });

    let request = match page.begin_submission(ValidationPolicy::Strict) {
        Ok(request) => request,
        Err(err) => {
            warn!(stage = "page", error = %err, "draft rejected");
            return Ok((StatusCode::UNPROCESSABLE_ENTITY, Html(render_page(&page))));
        }
    };

    if let Err(problem) = create_product(&state, &request).await {
        page.fail_submission(problem.detail());
        return Ok((problem.status(), Html(render_page(&page))));
    }

    match load_products(&state, "page").await {
        Ok(products) => {
            page.complete_submission(products);
            Ok((StatusCode::OK, Html(render_page(&page))))
        }
        Err(problem) => {
            page.fail_submission(problem.detail());
            Ok((problem.status(), Html(render_page(&page))))
        }
    }
}

/// `POST /cart`: applies one add or remove to the posted cart.
pub async fn cart(
    State(state): State<AppState>,
    Form(form): Form<CartForm>,
) -> Result<Html<String>, ProblemResponse> {
    let mut page = restore_page(&state, &form.cart).await?;

    if let Some(id) = form.add.as_deref() {
        match find_product(page.products(), id) {
            Some(product) => {
                if let Err(err) = page.add_to_cart(product) {
                    page.show_banner(err.to_string());
                }
            }
            None => page.show_banner(format!("product {id} no longer exists")),
        }
    }
    if let Some(index) = form.remove {
        if let Err(err) = page.remove_from_cart(index) {
            page.show_banner(err.to_string());
        }
    }

    Ok(Html(render_page(&page)))
}

/// Loads the product list and rebuilds the cart from the posted ids.
async fn restore_page(state: &AppState, cart: &str) -> Result<PageState, ProblemResponse> {
    let products = load_products(state, "page").await?;
    let mut page = PageState::new(products);

    for id in cart.split(',').map(str::trim).filter(|id| !id.is_empty()) {
        let Some(product) = find_product(page.products(), id) else {
            warn!(stage = "page", id, "dropping unknown cart entry");
            continue;
        };
        if let Err(err) = page.add_to_cart(product) {
            page.show_banner(err.to_string());
            break;
        }
    }
    Ok(page)
}

fn find_product(products: &[Product], id: &str) -> Option<Product> {
    products.iter().find(|product| product.id == id).cloned()
}

fn cart_field(state: &PageState) -> String {
    let ids: Vec<&str> = state
        .cart()
        .entries()
        .iter()
        .map(|product| product.id.as_str())
        .collect();
    format!(
        "<input type=\"hidden\" name=\"cart\" value=\"{}\">",
        escape_html(&ids.join(","))
    )
}

/// Renders the inventory page for the given state.
pub fn render_page(state: &PageState) -> String {
    let mut html = String::with_capacity(4096);
    html.push_str(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Inventory System</title>\n</head>\n<body>\n\
         <header><h6>Inventory System</h6></header>\n",
    );

    if let Some(banner) = state.banner() {
        let _ = writeln!(
            html,
            "<div class=\"banner\" role=\"alert\">{}</div>",
            escape_html(banner)
        );
    }

    render_form(&mut html, state);
    render_products(&mut html, state);
    render_cart(&mut html, state);

    html.push_str("</body>\n</html>\n");
    html
}

fn render_form(html: &mut String, state: &PageState) {
    let draft = state.draft();
    html.push_str(
        "<section class=\"create\">\n\
         <form id=\"create-product\" method=\"post\" action=\"/\">\n\
         <h5>Add Item</h5>\n<fieldset>\n",
    );
    html.push_str(&cart_field(state));
    html.push('\n');
    let _ = writeln!(
        html,
        "<label for=\"name\">Item Name:<input type=\"text\" id=\"name\" name=\"name\" value=\"{}\" required></label>",
        escape_html(&draft.name)
    );
    let _ = writeln!(
        html,
        "<label for=\"description\">Description:<textarea id=\"description\" name=\"description\" rows=\"3\" required>{}</textarea></label>",
        escape_html(&draft.description)
    );
    let _ = writeln!(
        html,
        "<label for=\"price\">Price:<input type=\"text\" id=\"price\" name=\"price\" value=\"{}\" required></label>",
        escape_html(&draft.price)
    );
    let _ = writeln!(
        html,
        "<label for=\"inventory\">Inventory:<input type=\"text\" id=\"inventory\" name=\"inventory\" value=\"{}\" required></label>",
        escape_html(&draft.inventory)
    );
    let disabled = if state.submit_enabled() { "" } else { " disabled" };
    let _ = writeln!(html, "<button type=\"submit\"{disabled}>Create Item</button>");
    html.push_str("</fieldset>\n</form>\n</section>\n");
}

fn render_products(html: &mut String, state: &PageState) {
    html.push_str("<section class=\"products\">\n<h5>Shop Items:</h5>\n");

    if state.shows_empty_state() {
        html.push_str(
            "<p class=\"empty-state\">No products yet. Create the first item to get started.</p>\n",
        );
        html.push_str("</section>\n");
        return;
    }

    html.push_str(
        "<table>\n<thead><tr><th>Name</th><th>Price</th><th>Inventory</th><th>Add to Cart</th></tr></thead>\n<tbody>\n",
    );
    let cart = cart_field(state);
    for product in state.products() {
        let _ = writeln!(
            html,
            "<tr data-key=\"{key}\"><td>{name}</td><td>{price}</td><td>{inventory}</td>\
             <td><form method=\"post\" action=\"/cart\">{cart}\
             <button type=\"submit\" class=\"add-to-cart\" name=\"add\" value=\"{id}\">+</button></form></td></tr>",
            key = escape_html(&product.name),
            name = escape_html(&product.name),
            price = product.price,
            inventory = product.inventory,
            id = escape_html(&product.id),
        );
    }
    html.push_str("</tbody>\n</table>\n</section>\n");
}

fn render_cart(html: &mut String, state: &PageState) {
    let cart = state.cart();
    html.push_str("<section class=\"cart\">\n<h6>Shopping Cart</h6>\n");

    if cart.is_empty() {
        html.push_str("<p class=\"empty-cart\">Your cart is empty.</p>\n</section>\n");
        return;
    }

    let hidden = cart_field(state);
    html.push_str("<table>\n<thead><tr><th>Name</th><th>Price</th><th></th></tr></thead>\n<tbody>\n");
    for (index, item) in cart.entries().iter().enumerate() {
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td>\
             <td><form method=\"post\" action=\"/cart\">{hidden}\
             <button type=\"submit\" class=\"remove-from-cart\" name=\"remove\" value=\"{index}\">Remove</button></form></td></tr>",
            escape_html(&item.name),
            item.price,
        );
    }
    html.push_str("</tbody>\n</table>\n");
    let _ = writeln!(html, "<div class=\"total\"><h6>Total: {}</h6></div>", cart.total());
    html.push_str("</section>\n");
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use inventory_core::draft::ValidationPolicy;
    use inventory_core::types::{Price, Product};

    fn product(name: &str, cents: i64) -> Product {
        Product {
            id: format!("id-{name}"),
            name: name.to_string(),
            description: "x".to_string(),
            price: Price::from_cents(cents),
            inventory: 5,
            created_at: Utc
                .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
                .single()
                .expect("valid timestamp"),
        }
    }

    #[test]
    fn empty_catalog_renders_explicit_empty_state() {
        let html = render_page(&PageState::new(Vec::new()));
        assert!(html.contains("No products yet"));
        assert!(!html.contains("<th>Inventory</th>"));
        assert!(html.contains("Your cart is empty."));
        assert!(!html.contains("Total:"));
    }

    #[test]
    fn products_render_with_formatted_prices() {
        let html = render_page(&PageState::new(vec![product("Widget", 999)]));
        assert!(html.contains("<td>Widget</td><td>$9.99</td><td>5</td>"));
        assert!(html.contains("name=\"add\" value=\"id-Widget\""));
        assert!(html.contains("<form method=\"post\" action=\"/cart\">"));
        assert!(!html.contains("No products yet"));
    }

    #[test]
    fn cart_total_renders_only_when_cart_has_items() {
        let mut state = PageState::new(vec![product("Widget", 999)]);
        state.add_to_cart(product("Widget", 999)).expect("widget");
        state.add_to_cart(product("Gadget", 1999)).expect("gadget");
        let html = render_page(&state);
        assert!(html.contains("Total: $29.98"));
        assert!(html.contains("name=\"remove\" value=\"1\""));
        assert!(html.contains("name=\"cart\" value=\"id-Widget,id-Gadget\""));
    }

    #[test]
    fn user_text_is_escaped() {
        let mut state = PageState::new(vec![product("<script>alert(1)</script>", 100)]);
        state.update_draft(|draft| draft.name = "\"quoted\" & more".to_string());
        let html = render_page(&state);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("value=\"&quot;quoted&quot; &amp; more\""));
    }

    #[test]
    fn submit_button_is_disabled_while_in_flight() {
        let mut state = PageState::default();
        state.update_draft(|draft| {
            draft.name = "Gadget".to_string();
            draft.description = "x".to_string();
            draft.price = "1".to_string();
            draft.inventory = "1".to_string();
        });
        assert!(render_page(&state).contains("<button type=\"submit\">"));

        state
            .begin_submission(ValidationPolicy::Strict)
            .expect("submission starts");
        assert!(render_page(&state).contains("<button type=\"submit\" disabled>"));
    }

    #[test]
    fn banner_renders_when_set() {
        let mut state = PageState::default();
        state.fail_refresh("store <offline>");
        let html = render_page(&state);
        assert!(html.contains("<div class=\"banner\" role=\"alert\">store &lt;offline&gt;</div>"));
    }
}
