use super::*;

use crate::editor::TestEditor;

#[derive(Debug)]
struct CyclicContainer {
    cyclic: bool,
}

impl Reachable for CyclicContainer {
    fn has_cycle(&self) -> bool {
        self.cyclic
    }

    fn encode(&self) -> Vec<u8> {
        b"container-bytes".to_vec()
    }

    fn clone_box(&self) -> Box<dyn Reachable> {
        Box::new(CyclicContainer { cyclic: self.cyclic })
    }
}

fn push(editor: &mut TestEditor, name: &str, value: VariableValue) {
    editor.globals.push(VariableEntry {
        name: name.as_bytes().to_vec(),
        value,
    });
}

#[test]
fn dumps_string_and_blob_variables() {
    let mut editor = TestEditor::new();
    push(&mut editor, "g:str", VariableValue::Str(b"hello".to_vec()));
    push(&mut editor, "g:blob", VariableValue::Blob(vec![1, 2, 3]));

    let mut dumper = VariableDumper::new();
    let dumped = dumper.dump(&editor);
    assert_eq!(dumped.len(), 2);
    let str_entry = dumped.iter().find(|p| p.name == b"g:str").unwrap();
    assert!(!str_entry.is_blob);
    let blob_entry = dumped.iter().find(|p| p.name == b"g:blob").unwrap();
    assert!(blob_entry.is_blob);
}

#[test]
fn skips_unrepresentable_values() {
    let mut editor = TestEditor::new();
    push(&mut editor, "g:Func", VariableValue::Unrepresentable);

    let mut dumper = VariableDumper::new();
    assert!(dumper.dump(&editor).is_empty());
}

#[test]
fn skips_cyclic_containers() {
    let mut editor = TestEditor::new();
    push(
        &mut editor,
        "g:cycle",
        VariableValue::Container(Box::new(CyclicContainer { cyclic: true })),
    );

    let mut dumper = VariableDumper::new();
    assert!(dumper.dump(&editor).is_empty());
}

#[test]
fn dumps_acyclic_containers_as_blob() {
    let mut editor = TestEditor::new();
    push(
        &mut editor,
        "g:tree",
        VariableValue::Container(Box::new(CyclicContainer { cyclic: false })),
    );

    let mut dumper = VariableDumper::new();
    let dumped = dumper.dump(&editor);
    assert_eq!(dumped.len(), 1);
    assert!(dumped[0].is_blob);
    assert_eq!(dumped[0].value, b"container-bytes");
}

#[test]
fn does_not_dump_the_same_name_twice() {
    let mut editor = TestEditor::new();
    push(&mut editor, "g:once", VariableValue::Str(b"v1".to_vec()));

    let mut dumper = VariableDumper::new();
    let first = dumper.dump(&editor);
    assert_eq!(first.len(), 1);
    assert!(dumper.already_dumped(b"g:once"));

    let second = dumper.dump(&editor);
    assert!(second.is_empty());
}
