//! Example: nested writes over an in-memory `Author.books` / `Book.author` relation.
//!
//! Run with: `cargo run --example author_books -p nestlink`

use nestlink::{
    Field, LinkError, MemoryDataSource, Model, ModelRelation, Record, RelationEngine,
    RequestContext,
};
use serde_json::{Value, json};
use std::sync::Arc;

fn print_header(title: &str) {
    println!("\n{title}");
    println!("{}", "-".repeat(title.len()));
}

fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap_or_default()
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[tokio::main]
async fn main() -> Result<(), LinkError> {
    let authors = Arc::new(MemoryDataSource::new("Author"));
    let books = Arc::new(MemoryDataSource::new("Book"));

    let engine = RelationEngine::builder()
        .model(
            Model::new("Author")
                .field(Field::scalar("id", "ID").auto_generated())
                .field(Field::scalar("name", "String")),
            authors.clone(),
        )
        .model(
            Model::new("Book")
                .field(Field::scalar("id", "ID").auto_generated())
                .field(Field::scalar("title", "String"))
                .field(Field::scalar("authorId", "ID")),
            books.clone(),
        )
        .relation(ModelRelation::one_to_many("Author", "books", "Book", Some("author")))
        .build()?;

    print_header("1. Schema");
    println!("{}", engine.sdl());

    print_header("2. Create an author with two new books");
    let author = engine
        .create(
            "Author",
            record(json!({
                "name": "Ursula",
                "books": {"create": [{"title": "The Dispossessed"}, {"title": "Lathe of Heaven"}]}
            })),
            RequestContext::new().with_request_id("create-author"),
        )
        .await?;
    let books_of = engine
        .resolve_field("Author", "books", &author, &RequestContext::new())
        .await?;
    println!("{}", pretty(&books_of));

    print_header("3. Create a book connected to the author (one write)");
    let book = engine
        .create(
            "Book",
            record(json!({"title": "Earthsea", "author": {"connect": {"id": author["id"]}}})),
            RequestContext::new(),
        )
        .await?;
    println!("{}", pretty(&Value::Object(book.clone())));

    print_header("4. Disconnect one book, delete another");
    let first = books_of[0]["id"].clone();
    engine
        .update(
            "Author",
            record(json!({"id": author["id"]})),
            record(json!({"books": {"disconnect": [{"id": first}], "delete": [{"id": book["id"]}]}})),
            RequestContext::new(),
        )
        .await?;
    let remaining = engine
        .resolve_field("Author", "books", &author, &RequestContext::new())
        .await?;
    println!("{}", pretty(&remaining));
    println!(
        "books stored: {}, author writes: {}, book writes: {}",
        books.len(),
        authors.stats().writes(),
        books.stats().writes()
    );

    print_header("5. Update-only operations are rejected on create");
    let err = engine
        .create(
            "Author",
            record(json!({"name": "X", "books": {"delete": [{"id": first}]}})),
            RequestContext::new(),
        )
        .await
        .unwrap_err();
    println!("error: {err}");

    Ok(())
}
