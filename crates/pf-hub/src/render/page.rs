//! Shop page shell: the filter form plus the results container.
//!
//! The form is pre-filled from the sanitized criteria so a shared URL
//! reproduces both the selection and the results.

use pf_core::query::{COLOR_TAXONOMY, SIZE_TAXONOMY};
use pf_core::criteria as fields;
use pf_core::{Availability, Criteria};

use super::escape_html;
use crate::catalog::TaxonomyProvider;

/// Id of the element whose content the client controller replaces.
pub const RESULTS_CONTAINER_ID: &str = "pf-results";

pub fn render_shop_page(criteria: &Criteria, taxonomy: &dyn TaxonomyProvider, results: &str) -> String {
    let mut form = String::new();

    let category_options: Vec<(String, String)> = taxonomy
        .categories()
        .into_iter()
        .map(|c| (c.id.to_string(), c.name))
        .collect();
    let selected_category = criteria.category_id().map(|id| id.to_string());
    form.push_str(&select_group(
        "Category",
        fields::CATEGORY,
        ("0", "All Categories"),
        &category_options,
        selected_category.as_deref(),
    ));

    form.push_str(&format!(
        "<div class=\"filter-group\"><label>Price Range</label>\
<input type=\"number\" name=\"{min_name}\" placeholder=\"Min Price\" value=\"{min}\">\
<input type=\"number\" name=\"{max_name}\" placeholder=\"Max Price\" value=\"{max}\"></div>\n",
        min_name = fields::MIN_PRICE,
        max_name = fields::MAX_PRICE,
        min = criteria.min_price().map(|p| p.to_string()).unwrap_or_default(),
        max = criteria.max_price().map(|p| p.to_string()).unwrap_or_default(),
    ));

    for (label, name, taxonomy_name) in [
        ("Color", fields::COLOR, COLOR_TAXONOMY),
        ("Size", fields::SIZE, SIZE_TAXONOMY),
    ] {
        let options: Vec<(String, String)> = taxonomy
            .terms(taxonomy_name)
            .into_iter()
            .map(|t| (t.slug, t.name))
            .collect();
        let selected = if name == fields::COLOR {
            criteria.color_slug()
        } else {
            criteria.size_slug()
        };
        let placeholder = format!("Select {}", label);
        form.push_str(&select_group(
            label,
            name,
            ("", placeholder.as_str()),
            &options,
            selected,
        ));
    }

    let brand_options: Vec<(String, String)> = taxonomy
        .brands()
        .into_iter()
        .map(|b| (b.clone(), b))
        .collect();
    form.push_str(&select_group(
        "Brand",
        fields::BRAND,
        ("", "Select Brand"),
        &brand_options,
        criteria.brand(),
    ));

    let availability_options: Vec<(String, String)> = [
        (Availability::InStock, "In Stock"),
        (Availability::OutOfStock, "Out of Stock"),
    ]
    .iter()
    .map(|(a, label)| (a.as_str().to_string(), label.to_string()))
    .collect();
    form.push_str(&select_group(
        "Availability",
        fields::AVAILABILITY,
        (Availability::All.as_str(), "All"),
        &availability_options,
        Some(criteria.availability().as_str()),
    ));

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>Shop</title><link rel=\"canonical\" href=\"{canonical}\"></head>\n<body>\n\
<div id=\"pf-filter\">\n<form id=\"pf-filter-form\" method=\"get\" action=\"/shop\" data-endpoint=\"/api/filter\">\n\
{form}<button type=\"submit\">Filter</button>\n<a href=\"/shop\" id=\"reset-filters\">Reset</a>\n</form>\n\
<div id=\"{results_id}\">{results}</div>\n</div>\n</body>\n</html>\n",
        canonical = escape_html(&shop_url(criteria)),
        form = form,
        results_id = RESULTS_CONTAINER_ID,
        results = results,
    )
}

/// `/shop` plus the criteria as a query string.
pub fn shop_url(criteria: &Criteria) -> String {
    let query: Vec<String> = criteria
        .to_params()
        .into_iter()
        .map(|(name, value)| format!("{}={}", name, urlencoding::encode(&value)))
        .collect();
    if query.is_empty() {
        "/shop".to_string()
    } else {
        format!("/shop?{}", query.join("&"))
    }
}

fn select_group(
    label: &str,
    name: &str,
    placeholder: (&str, &str),
    options: &[(String, String)],
    selected: Option<&str>,
) -> String {
    let mut html = format!(
        "<div class=\"filter-group\"><label for=\"filter-{name}\">{label}</label><select id=\"filter-{name}\" name=\"{name}\">",
        name = name,
        label = label,
    );
    html.push_str(&option(placeholder.0, placeholder.1, selected == Some(placeholder.0)));
    for (value, text) in options {
        html.push_str(&option(value, text, selected == Some(value.as_str())));
    }
    // An active value missing from the listing (partial brand, unknown slug)
    // must survive a resubmit of the form.
    if let Some(current) = selected {
        if current != placeholder.0 && !options.iter().any(|(value, _)| value == current) {
            html.push_str(&option(current, current, true));
        }
    }
    html.push_str("</select></div>\n");
    html
}

fn option(value: &str, text: &str, selected: bool) -> String {
    format!(
        "<option value=\"{}\"{}>{}</option>",
        escape_html(value),
        if selected { " selected" } else { "" },
        escape_html(text)
    )
}
