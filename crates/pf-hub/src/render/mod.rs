//! # Rendering
//!
//! Turns products into markup. The filter endpoint only needs
//! [`ProductRenderer`]; [`page`] renders the full shop page around it.

pub mod page;

use pf_core::Product;

/// Renders one product as a markup fragment.
pub trait ProductRenderer: Send + Sync {
    fn render(&self, product: &Product) -> String;
}

/// Product card renderer (`<li class="product">`).
pub struct HtmlRenderer {
    currency_symbol: String,
}

impl HtmlRenderer {
    pub fn new(currency_symbol: impl Into<String>) -> Self {
        Self {
            currency_symbol: currency_symbol.into(),
        }
    }

    fn permalink(&self, product: &Product) -> String {
        match &product.permalink {
            Some(url) => url.clone(),
            None if !product.slug.is_empty() => format!("/product/{}", product.slug),
            None => format!("/product/{}", product.id),
        }
    }
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self::new("$")
    }
}

impl ProductRenderer for HtmlRenderer {
    fn render(&self, product: &Product) -> String {
        let status = product.stock_status.as_str();
        let image = product
            .image
            .as_deref()
            .map(|src| {
                format!(
                    "<img src=\"{}\" alt=\"{}\">",
                    escape_html(src),
                    escape_html(&product.name)
                )
            })
            .unwrap_or_default();

        format!(
            "<li class=\"product product-{id} {status}\" data-product-id=\"{id}\">\
<a href=\"{href}\" class=\"product-link\">{image}<h2 class=\"product-title\">{name}</h2>\
<span class=\"price\">{currency}{price:.2}</span></a>\
<span class=\"stock {status}\">{label}</span></li>\n",
            id = product.id,
            status = status,
            href = escape_html(&self.permalink(product)),
            image = image,
            name = escape_html(&product.name),
            currency = escape_html(&self.currency_symbol),
            price = product.price,
            label = product.stock_status.label(),
        )
    }
}

/// Escapes text for use in HTML content and double-quoted attributes.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
