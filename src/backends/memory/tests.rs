//! Tests for the in-memory adapter.

use super::*;
use crate::action::{Action, Capabilities};
use crate::adapter::Adapter;
use crate::error::HfsError;
use crate::types::{
    CopyOptions, DeleteOptions, GetOptions, Head, HeadPatch, HeadStrategy, ListOptions,
    MoveOptions, PostOptions, PutHeadOptions, PutOptions,
};

type Mem = MemoryAdapter<Vec<u8>>;

fn paths(list: &[&str]) -> Vec<String> {
    list.iter().map(|p| p.to_string()).collect()
}

fn seeded() -> Mem {
    let mem = Mem::new();
    mem.insert(Head::file("/a.txt"), Some(b"a".to_vec())).unwrap();
    mem.insert(Head::file("/b.txt"), None).unwrap();
    mem.insert(Head::file("/docs/c.txt"), Some(b"c".to_vec())).unwrap();
    mem
}

#[tokio::test]
async fn test_insert_creates_parents() {
    let mem = Mem::new();
    mem.insert(Head::file("x/y/z.txt"), None).unwrap();

    assert!(mem.contains("/x"));
    assert!(mem.contains("/x/y"));
    assert!(mem.head("/x/y").await.unwrap().unwrap().is_dir);
    assert_eq!(mem.head("/x/y/z.txt").await.unwrap().unwrap().path, "/x/y/z.txt");
}

#[tokio::test]
async fn test_insert_below_file_fails() {
    let mem = seeded();
    let err = mem.insert(Head::file("/a.txt/inner"), None).unwrap_err();
    assert!(matches!(err, HfsError::NotADirectory(_)));
}

#[tokio::test]
async fn test_list_sorted_and_paged() {
    let mem = seeded();

    let all = mem.list("/", &ListOptions::default()).await.unwrap();
    let names: Vec<_> = all.entries.iter().map(|h| h.path.as_str()).collect();
    assert_eq!(names, vec!["/a.txt", "/b.txt", "/docs"]);
    assert!(!all.has_next);

    let first = mem.list("/", &ListOptions::page(0, 2)).await.unwrap();
    assert_eq!(first.entries.len(), 2);
    assert!(first.has_next);

    let second = mem.list("/", &ListOptions::page(2, 2)).await.unwrap();
    assert_eq!(second.entries[0].path, "/docs");
    assert!(!second.has_next);

    let past_end = mem.list("/", &ListOptions::page(10, 2)).await.unwrap();
    assert!(past_end.entries.is_empty());
    assert!(!past_end.has_next);
}

#[tokio::test]
async fn test_list_errors() {
    let mem = seeded();
    assert!(matches!(
        mem.list("/missing", &ListOptions::default()).await,
        Err(HfsError::NotFound(_))
    ));
    assert!(matches!(
        mem.list("/a.txt", &ListOptions::default()).await,
        Err(HfsError::NotADirectory(_))
    ));
    assert!(matches!(
        mem.list("/../etc", &ListOptions::default()).await,
        Err(HfsError::InvalidPath(_))
    ));
}

#[tokio::test]
async fn test_head_and_heads() {
    let mem = seeded();
    assert!(mem.head("/nope").await.unwrap().is_none());

    let heads = mem.heads(&paths(&["/a.txt", "docs/c.txt"])).await.unwrap();
    assert_eq!(heads[1].path, "/docs/c.txt");

    let err = mem.heads(&paths(&["/a.txt", "/nope"])).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_post_and_get() {
    let mem = Mem::new();
    let head = mem
        .post(
            "/new.txt",
            &Head::file("ignored").with_meta("name", "new"),
            Some(b"hello".to_vec()),
            &PostOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(head.path, "/new.txt");
    assert_eq!(head.meta("name"), Some(&serde_json::json!("new")));

    let data = mem.get("/new.txt", &GetOptions::default()).await.unwrap();
    assert_eq!(data, Some(b"hello".to_vec()));

    let err = mem
        .post("/new.txt", &Head::file("/new.txt"), None, &PostOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_already_exists());

    mem.post("/new.txt", &Head::file("/new.txt"), None, &PostOptions::overwrite())
        .await
        .unwrap();
    assert_eq!(mem.data("/new.txt"), None);
}

#[tokio::test]
async fn test_post_requires_parent() {
    let mem = Mem::new();
    let err = mem
        .post("/no/such.txt", &Head::file("/no/such.txt"), None, &PostOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_post_many_checks_all_first() {
    let mem = seeded();
    let err = mem
        .post_many(
            &paths(&["/new.txt", "/a.txt"]),
            &[Head::file("/new.txt"), Head::file("/a.txt")],
            vec![None, None],
            &PostOptions::default(),
        )
        .await
        .unwrap_err();
    assert!(err.is_already_exists());
    assert!(!mem.contains("/new.txt"));

    let err = mem
        .post_many(&paths(&["/x"]), &[], vec![], &PostOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_invalid_arguments());
}

#[tokio::test]
async fn test_get_errors() {
    let mem = seeded();
    assert!(matches!(
        mem.get("/docs", &GetOptions::default()).await,
        Err(HfsError::IsADirectory(_))
    ));
    assert!(mem.get("/nope", &GetOptions::default()).await.unwrap_err().is_not_found());
    assert_eq!(mem.get("/b.txt", &GetOptions::default()).await.unwrap(), None);
}

#[tokio::test]
async fn test_put_bumps_version() {
    let mem = seeded();
    assert_eq!(mem.version("/a.txt"), Some(0));

    mem.put("/a.txt", b"one".to_vec(), &PutOptions::default()).await.unwrap();
    mem.put("/a.txt", b"two".to_vec(), &PutOptions::default()).await.unwrap();

    assert_eq!(mem.version("/a.txt"), Some(2));
    assert_eq!(mem.data("/a.txt"), Some(b"two".to_vec()));
    assert!(matches!(
        mem.put("/docs", vec![], &PutOptions::default()).await,
        Err(HfsError::IsADirectory(_))
    ));
}

#[tokio::test]
async fn test_remove() {
    let mem = seeded();

    // Non-empty directory needs recursive
    let err = mem.remove("/docs", &DeleteOptions::default()).await.unwrap_err();
    assert!(err.is_invalid_arguments());

    let recursive = DeleteOptions {
        recursive: true,
        ..Default::default()
    };
    mem.remove("/docs", &recursive).await.unwrap();
    assert!(!mem.contains("/docs"));
    assert!(!mem.contains("/docs/c.txt"));

    assert!(mem.remove("/docs", &DeleteOptions::default()).await.unwrap_err().is_not_found());
    let force = DeleteOptions {
        force: true,
        ..Default::default()
    };
    mem.remove("/docs", &force).await.unwrap();

    assert!(matches!(
        mem.remove("/", &recursive).await,
        Err(HfsError::PermissionDenied(_))
    ));
}

#[tokio::test]
async fn test_remove_many() {
    let mem = seeded();
    mem.remove_many(&paths(&["/a.txt", "/b.txt"]), &DeleteOptions::default())
        .await
        .unwrap();
    assert!(!mem.contains("/a.txt"));
    assert!(!mem.contains("/b.txt"));
    assert_eq!(mem.len(), 3);
}

#[tokio::test]
async fn test_move_subtree() {
    let mem = seeded();
    let moved = mem
        .move_entry("/docs", "/archive", &MoveOptions::default())
        .await
        .unwrap();
    assert_eq!(moved.path, "/archive");
    assert!(moved.is_dir);

    assert!(!mem.contains("/docs"));
    assert!(!mem.contains("/docs/c.txt"));
    assert_eq!(mem.data("/archive/c.txt"), Some(b"c".to_vec()));
    let head = mem.head("/archive/c.txt").await.unwrap().unwrap();
    assert_eq!(head.path, "/archive/c.txt");
}

#[tokio::test]
async fn test_move_overwrite() {
    let mem = seeded();
    let err = mem
        .move_entry("/a.txt", "/b.txt", &MoveOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_already_exists());
    assert!(mem.contains("/a.txt"));

    mem.move_entry("/a.txt", "/b.txt", &MoveOptions::overwrite())
        .await
        .unwrap();
    assert!(!mem.contains("/a.txt"));
    assert_eq!(mem.data("/b.txt"), Some(b"a".to_vec()));
}

#[tokio::test]
async fn test_move_into_itself_fails() {
    let mem = seeded();
    let err = mem
        .move_entry("/docs", "/docs/inner", &MoveOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_invalid_arguments());
    assert!(mem.contains("/docs/c.txt"));
}

#[tokio::test]
async fn test_copy_keeps_source() {
    let mem = seeded();
    mem.copy_entry("/docs", "/copy", &CopyOptions::default())
        .await
        .unwrap();
    assert!(mem.contains("/docs/c.txt"));
    assert_eq!(mem.data("/copy/c.txt"), Some(b"c".to_vec()));
}

#[tokio::test]
async fn test_move_many_and_copy_many() {
    let mem = seeded();
    mem.mkdir("/dst", None).await.unwrap();

    let moved = mem
        .move_many(
            &paths(&["/a.txt", "/b.txt"]),
            &paths(&["/dst/a.txt", "/dst/b.txt"]),
            &MoveOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(moved.len(), 2);
    assert!(mem.contains("/dst/b.txt"));
    assert!(!mem.contains("/a.txt"));

    let copied = mem
        .copy_many(&paths(&["/dst/a.txt"]), &paths(&["/a.txt"]), &CopyOptions::default())
        .await
        .unwrap();
    assert_eq!(copied[0].path, "/a.txt");

    let err = mem
        .copy_many(&paths(&["/dst/a.txt"]), &[], &CopyOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_invalid_arguments());
}

#[tokio::test]
async fn test_mkdir() {
    let mem = Mem::new();
    let head = mem
        .mkdir("/photos", Some(&HeadPatch::new().with_meta("name", "Photos")))
        .await
        .unwrap();
    assert!(head.is_dir);
    assert_eq!(head.meta("name"), Some(&serde_json::json!("Photos")));

    assert!(mem.mkdir("/photos", None).await.unwrap_err().is_already_exists());
}

#[tokio::test]
async fn test_put_head_strategies() {
    let mem = Mem::new();
    mem.insert(Head::file("/a.txt").with_meta("name", "a").with_meta("tag", "x"), None)
        .unwrap();

    let merged = mem
        .put_head(
            "/a.txt",
            &HeadPatch::new().with_meta("name", "b"),
            &PutHeadOptions::default(),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(merged.meta("name"), Some(&serde_json::json!("b")));
    assert_eq!(merged.meta("tag"), Some(&serde_json::json!("x")));

    let replaced = mem
        .put_head(
            "/a.txt",
            &HeadPatch::new().with_meta("name", "c"),
            &PutHeadOptions {
                strategy: HeadStrategy::Replace,
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(replaced.meta("tag"), None);
    assert_eq!(replaced.path, "/a.txt");

    let err = mem
        .put_head("/a.txt", &HeadPatch::new().is_dir(true), &PutHeadOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_invalid_arguments());
}

#[tokio::test]
async fn test_put_heads() {
    let mem = seeded();
    let updated = mem
        .put_heads(
            &paths(&["/a.txt", "/b.txt"]),
            &[HeadPatch::new().with_meta("n", 1), HeadPatch::new().with_meta("n", 2)],
            &PutHeadOptions::default(),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated[1].meta("n"), Some(&serde_json::json!(2)));
}

#[tokio::test]
async fn test_move_onto_itself_keeps_entry() {
    let mem = seeded();
    let head = mem
        .move_entry("/a.txt", "/a.txt", &MoveOptions::overwrite())
        .await
        .unwrap();
    assert_eq!(head.path, "/a.txt");
    assert_eq!(mem.data("/a.txt"), Some(b"a".to_vec()));

    let head = mem
        .copy_entry("/docs", "/docs", &CopyOptions::overwrite())
        .await
        .unwrap();
    assert!(head.is_dir);
    assert!(mem.contains("/docs/c.txt"));

    let err = mem
        .move_entry("/nope", "/nope", &MoveOptions::overwrite())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_batches_apply_all_or_nothing() {
    let mem = seeded();
    let before = mem.len();

    let err = mem
        .move_many(
            &paths(&["/a.txt", "/missing"]),
            &paths(&["/moved.txt", "/elsewhere"]),
            &MoveOptions::default(),
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(mem.contains("/a.txt"));
    assert!(!mem.contains("/moved.txt"));

    let err = mem
        .post_many(
            &paths(&["/new.txt", "/nowhere/x.txt"]),
            &[Head::file("/new.txt"), Head::file("/nowhere/x.txt")],
            vec![None, None],
            &PostOptions::overwrite(),
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(!mem.contains("/new.txt"));

    let err = mem
        .put_heads(
            &paths(&["/a.txt", "/missing"]),
            &[HeadPatch::new().with_meta("n", 1), HeadPatch::new().with_meta("n", 2)],
            &PutHeadOptions::default(),
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    let head = mem.head("/a.txt").await.unwrap().unwrap();
    assert!(head.meta("n").is_none());

    let err = mem
        .remove_many(&paths(&["/b.txt", "/missing"]), &DeleteOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(mem.contains("/b.txt"));

    assert_eq!(mem.len(), before);
}

#[test]
fn test_capabilities() {
    let mem = Mem::new();
    assert!(mem.capabilities().contains(Action::Put));

    let limited = Mem::new().with_capabilities(Capabilities::of(&[Action::Get]));
    assert!(limited.capabilities().contains(Action::Get));
    assert!(!limited.capabilities().contains(Action::Put));
    // list/head are always available
    assert!(limited.capabilities().contains(Action::List));
}

#[test]
fn test_clones_share_storage() {
    let mem = Mem::new();
    let other = mem.clone();
    other.insert(Head::file("/shared"), None).unwrap();
    assert!(mem.contains("/shared"));
    assert!(!mem.is_empty());
}
