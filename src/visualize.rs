//! `dbdiag visualize`: emit a static, dependency-free HTML page listing
//! phenomena and root causes with edge weights — a minimal substitute for a
//! full graph-layout renderer.

use dbdiag_entities::phenomenon_root_cause;
use dbdiag_shared::AppError;
use sea_orm::{DatabaseConnection, EntityTrait};

fn escape(s: &str) -> String {
  s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

pub async fn render(db: &DatabaseConnection, layout: Option<&str>) -> Result<String, AppError> {
  let phenomena = dbdiag_core::knowledge_store::all_phenomena(db).await?;
  let root_causes = dbdiag_core::knowledge_store::all_root_causes(db).await?;
  let edges = phenomenon_root_cause::Entity::find().all(db).await?;

  let mut body = String::new();
  body.push_str("<h1>dbdiag knowledge graph</h1>\n");
  if let Some(layout) = layout {
    body.push_str(&format!("<p>layout hint: {}</p>\n", escape(layout)));
  }

  body.push_str("<h2>Phenomena</h2>\n<ul>\n");
  for p in &phenomena {
    body.push_str(&format!("<li>{} — {} (cluster size {})</li>\n", escape(&p.id), escape(&p.description), p.cluster_size));
  }
  body.push_str("</ul>\n");

  body.push_str("<h2>Root causes</h2>\n<ul>\n");
  for rc in &root_causes {
    body.push_str(&format!("<li>{} — {} (tickets {})</li>\n", escape(&rc.id), escape(&rc.description), rc.ticket_count));
  }
  body.push_str("</ul>\n");

  body.push_str("<h2>Edges</h2>\n<table border=\"1\"><tr><th>phenomenon</th><th>root cause</th><th>ticket count</th></tr>\n");
  for e in &edges {
    body.push_str(&format!(
      "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
      escape(&e.phenomenon_id),
      escape(&e.root_cause_id),
      e.ticket_count
    ));
  }
  body.push_str("</table>\n");

  Ok(format!("<!doctype html><html><head><meta charset=\"utf-8\"><title>dbdiag knowledge graph</title></head><body>\n{body}</body></html>\n"))
}
