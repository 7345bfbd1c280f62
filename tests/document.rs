//! Walk a realistic document through the pull cursor

use pullxml::{parse, parse_tokens, Content, Error, ErrorKind, TokenKind};
use std::ops::ControlFlow;

const CATALOG: &str = include_str!("resources/catalog.xml");

#[derive(Debug, Default, PartialEq)]
struct Book {
    id: String,
    author: String,
    title: String,
    price: Option<(String, String)>,
    tags: Vec<String>,
    description: String,
}

/// Decoded character data and raw CDATA of the focused element
fn text_of(content: &mut Content<'_, '_>) -> Result<String, Error> {
    let mut text = String::new();
    content.handle_tag(|_, body| {
        if let Some(body) = body {
            while body.advance() {
                if body.is_sdata() {
                    text.push_str(&body.decoded());
                } else if body.is_cdata() {
                    text.push_str(body.value());
                }
            }
        }
        Ok(())
    })?;
    Ok(text)
}

fn read_book(content: &mut Content<'_, '_>) -> Result<Book, Error> {
    let mut book = Book::default();
    content.handle_tag(|attrs, body| {
        book.id = attrs.get("id").unwrap_or_default().into_owned();
        let Some(body) = body else {
            return Ok(());
        };
        while body.advance_to_tag() {
            match body.name() {
                "author" => book.author = body.child_string_content().to_string(),
                "title" => book.title = text_of(body)?,
                "description" => book.description = text_of(body)?,
                "price" => {
                    let mut currency = String::new();
                    let mut amount = String::new();
                    body.handle_tag(|attrs, value| {
                        currency = attrs.get("currency").unwrap_or_default().into_owned();
                        if let Some(value) = value {
                            if value.advance() {
                                amount = value.decoded().into_owned();
                            }
                        }
                        Ok(())
                    })?;
                    book.price = Some((currency, amount));
                }
                "tags" => body.handle_tag(|_, tags| {
                    if let Some(tags) = tags {
                        while tags.advance_to_tag() {
                            book.tags.push(tags.child_string_content().to_string());
                        }
                    }
                    Ok(())
                })?,
                _ => {}
            }
        }
        Ok(())
    })?;
    Ok(book)
}

#[test]
fn test_read_catalog() {
    let mut prolog = Vec::new();
    let mut books = Vec::new();
    parse(CATALOG, |root| {
        while root.advance() {
            match root.kind() {
                Some(TokenKind::Tag) => root.handle_tag(|attrs, content| {
                    assert_eq!(attrs.get("generated").as_deref(), Some("2024-01-31"));
                    assert_eq!(attrs.get("note").as_deref(), Some("Tom & Jerry"));
                    assert_eq!(attrs.get_raw("note"), Some("Tom &amp; Jerry"));
                    if let Some(content) = content {
                        while content.advance_to_tag() {
                            if content.name() == "book" {
                                books.push(read_book(content)?);
                            }
                        }
                    }
                    Ok(())
                })?,
                Some(kind) => prolog.push((kind, root.name())),
                None => {}
            }
        }
        Ok(())
    })
    .unwrap();

    assert_eq!(
        prolog,
        vec![
            (TokenKind::XmlDecl, ""),
            (TokenKind::DocTypeDecl, "catalog"),
            (TokenKind::Comment, ""),
            (TokenKind::Pi, "xml-stylesheet"),
        ]
    );

    assert_eq!(books.len(), 3);
    assert_eq!(
        books[0],
        Book {
            id: "bk101".into(),
            author: "Gambardella, Matthew".into(),
            title: "XML Developer's Guide".into(),
            price: Some(("USD".into(), "44.95".into())),
            tags: Vec::new(),
            description: "An in-depth look at <xml> & friends.".into(),
        }
    );
    assert_eq!(books[1].tags, vec!["fantasy", "fiction"]);
    assert_eq!(
        books[1].description,
        "A former architect battles corporate zombies,\nan evil sorceress, and her own childhood to become queen\nof the world."
    );
    assert_eq!(
        books[2],
        Book {
            id: "bk103".into(),
            ..Book::default()
        }
    );
}

#[test]
fn test_catalog_tag_count() {
    let mut tags = 0;
    parse_tokens(CATALOG, |t| {
        if t.kind == TokenKind::Tag {
            tags += 1;
        }
        ControlFlow::Continue(())
    })
    .unwrap();
    assert_eq!(tags, 15);
}

#[test]
fn test_broken_catalog_position() {
    let broken = CATALOG.replacen("</tags>", "</tag>", 1);
    let err = parse(&broken, |_| Ok(())).unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::MismatchingTag));
    assert_eq!(err.to_string(), "xml parser [20:45]: mismatching tag");
}
