use std::cell::RefCell;
use std::io::Cursor;
use std::rc::Rc;

use zen_archive::{
    begin_object, ArchiveReader, ArchiveWriter, AsciiReader, AsciiWriter, ObjectCache,
    ObjectOutcome, ObjectRegistry,
};

type Thing = Rc<RefCell<String>>;

/// Scenario (c): an object whose class name is `"§"` (the back-reference
/// sentinel) resolves to the very same shared instance as the object
/// originally recorded at that index, rather than constructing a new one.
#[test]
fn back_reference_resolves_to_same_instance() {
    let mut writer = AsciiWriter::new(Cursor::new(Vec::<u8>::new())).unwrap();
    let index = writer.write_object_begin("first", "TestClass", 1).unwrap();
    writer.write_string("name", "original").unwrap();
    writer.write_object_end().unwrap();
    writer.write_ref("alias", index).unwrap();
    let buf = writer.finish().unwrap().into_inner();

    let mut reader = AsciiReader::new(Cursor::new(buf)).unwrap();

    let mut registry: ObjectRegistry<Thing> = ObjectRegistry::new();
    registry.register("TestClass", 0, 0, || Rc::new(RefCell::new(String::new())));
    let mut cache: ObjectCache<Thing> = ObjectCache::new();

    let first = match begin_object(&mut reader, &registry, &cache).unwrap() {
        ObjectOutcome::New {
            object,
            index,
            version,
            ..
        } => {
            assert_eq!(version, 1);
            *object.borrow_mut() = reader.read_string().unwrap();
            reader.read_object_end().unwrap();
            cache.insert(index, object.clone());
            object
        }
        _ => panic!("expected a newly constructed object"),
    };
    assert_eq!(*first.borrow(), "original");

    let second = match begin_object(&mut reader, &registry, &cache).unwrap() {
        ObjectOutcome::BackReference(object) => object,
        _ => panic!("expected a back reference"),
    };

    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(*second.borrow(), "original");

    assert!(matches!(
        begin_object(&mut reader, &registry, &cache).unwrap(),
        ObjectOutcome::NoMoreObjects
    ));
}

/// A back reference to an index that was never recorded resolves to
/// [`ObjectOutcome::Absent`] (logged as a warning) rather than panicking.
#[test]
fn dangling_back_reference_is_absent() {
    let mut writer = AsciiWriter::new(Cursor::new(Vec::<u8>::new())).unwrap();
    writer.write_ref("dangling", 99).unwrap();
    let buf = writer.finish().unwrap().into_inner();

    let mut reader = AsciiReader::new(Cursor::new(buf)).unwrap();
    let registry: ObjectRegistry<Thing> = ObjectRegistry::new();
    let cache: ObjectCache<Thing> = ObjectCache::new();

    assert!(matches!(
        begin_object(&mut reader, &registry, &cache).unwrap(),
        ObjectOutcome::Absent
    ));
}

/// An object whose class name the registry doesn't recognize is skipped
/// whole (including its subtree) rather than failing the read.
#[test]
fn unknown_class_is_skipped() {
    let mut writer = AsciiWriter::new(Cursor::new(Vec::<u8>::new())).unwrap();
    writer.write_object_begin("weird", "zCUnknownClass", 1).unwrap();
    writer.write_int("whatever", 7).unwrap();
    writer.write_object_end().unwrap();
    writer.write_object_begin("after", "TestClass", 1).unwrap();
    writer.write_object_end().unwrap();
    let buf = writer.finish().unwrap().into_inner();

    let mut reader = AsciiReader::new(Cursor::new(buf)).unwrap();
    let mut registry: ObjectRegistry<Thing> = ObjectRegistry::new();
    registry.register("TestClass", 0, 0, || Rc::new(RefCell::new(String::new())));
    let cache: ObjectCache<Thing> = ObjectCache::new();

    assert!(matches!(
        begin_object(&mut reader, &registry, &cache).unwrap(),
        ObjectOutcome::UnknownClass
    ));
    assert!(matches!(
        begin_object(&mut reader, &registry, &cache).unwrap(),
        ObjectOutcome::New { .. }
    ));
}
