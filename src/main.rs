use serde::Serialize;
use tracing_subscriber::{EnvFilter, fmt};
use utpl::Engine;

#[derive(Serialize)]
struct Item {
    name: String,
    count: i64,
}

#[derive(Serialize)]
struct Dashboard {
    title: String,
    items: Vec<Item>,
    show_totals: bool,
}

fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::new("debug")).init();

    let dashboard = Dashboard {
        title: "Inventory".to_string(),
        items: vec![
            Item {
                name: "bolts".to_string(),
                count: 120,
            },
            Item {
                name: "nuts".to_string(),
                count: 80,
            },
        ],
        show_totals: true,
    };

    let template = r#"<h1><%= title.capitalize %></h1>
<ul>
<% for i, item in items.enumerate %>  <li><%= i %>: <%= item.name %> (<%= item.count %>)</li>
<% end %></ul>
<% if show_totals == true %><p><%= items.len %> line(s)</p>
<% end %>"#;

    let engine = Engine::new();
    let html = engine.render_template("dashboard", template, &dashboard)?;
    println!("{}", html);

    Ok(())
}
