//! Document loading tests using generated files.

use std::path::Path;

use docinsight_rag::{DocumentLoader, FileLoader, PdfLoader, RagError, TextLoader};
use lopdf::content::{Content, Operation};
use lopdf::{Object, Stream, dictionary};

/// Write a PDF with one page per entry of `pages`.
fn write_pdf(path: &Path, pages: &[&str]) {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Count" => count,
        "Kids" => kids,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

#[test]
fn pdf_loads_one_block_per_page() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.pdf");
    write_pdf(&path, &["Hello from page one", "Goodbye from page two"]);

    let document = FileLoader.load(&path).unwrap();
    assert_eq!(document.source, "report.pdf");
    assert_eq!(document.blocks.len(), 2);
    assert!(document.blocks[0].text.contains("Hello"));
    assert!(document.blocks[1].text.contains("Goodbye"));
    assert_eq!(document.blocks[0].metadata["page"], "1");
    assert_eq!(document.blocks[1].metadata["page"], "2");
    assert_eq!(document.blocks[1].metadata["source"], "report.pdf");
}

#[test]
fn corrupt_pdf_is_a_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.pdf");
    std::fs::write(&path, b"this is not a pdf").unwrap();

    let err = PdfLoader.load(&path).unwrap_err();
    assert!(matches!(err, RagError::LoadError(_)));
}

#[test]
fn missing_file_is_a_load_error() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["absent.pdf", "absent.txt"] {
        let err = FileLoader.load(&dir.path().join(name)).unwrap_err();
        assert!(matches!(err, RagError::LoadError(_)), "{name}: {err}");
    }
}

#[test]
fn text_file_loads_as_single_block() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.md");
    std::fs::write(&path, "# Notes\n\nGrass is green.").unwrap();

    let document = FileLoader.load(&path).unwrap();
    assert_eq!(document.blocks.len(), 1);
    assert_eq!(document.blocks[0].text, "# Notes\n\nGrass is green.");
    assert_eq!(document.char_count(), 24);
}

#[test]
fn invalid_utf8_text_is_a_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("binary.txt");
    std::fs::write(&path, [0xff, 0xfe, 0xfd]).unwrap();

    assert!(matches!(TextLoader.load(&path).unwrap_err(), RagError::LoadError(_)));
}

#[test]
fn unsupported_extension_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sheet.xlsx");
    std::fs::write(&path, b"data").unwrap();

    assert!(!FileLoader::supports(&path));
    assert!(FileLoader::supports(Path::new("REPORT.PDF")));
    assert!(matches!(FileLoader.load(&path).unwrap_err(), RagError::LoadError(_)));
}
