//! Predefined view scenarios

#![allow(dead_code)]

use super::view::*;
use clearcase_navigator::core::error::Result;

/// Scenario: a view with one element `f.txt`
pub fn create_single_file_view() -> Result<TestView> {
    let view = setup_test_view()?;
    create_file(&view, "f.txt", "hello\n")?;
    Ok(view)
}

/// Scenario: one checkout, two hijacked files, view-private files incl. a `.keep`
pub fn create_mixed_view() -> Result<TestView> {
    let view = setup_test_view()?;
    let checked_out = create_file(&view, "src/main.c", "int main;\n")?;
    create_file(&view, "src/util.c", "hijacked\n")?;
    create_file(&view, "include/util.h", "hijacked\n")?;
    create_file(&view, "src/clean.c", "clean\n")?;
    create_file(&view, "notes.txt", "private\n")?;
    create_file(&view, "src/main.c.keep", "backup\n")?;

    view.add_checkout(&checked_out)?;
    view.set_listing(concat!(
        "src/clean.c@@/main/2                 Rule: /main/LATEST\n",
        "src/util.c@@/main/3 [hijacked]       Rule: /main/LATEST\n",
        "include/util.h@@/main/1 [hijacked]   Rule: /main/LATEST\n",
    ))?;
    view.set_private("notes.txt\nsrc/main.c.keep\n")?;
    Ok(view)
}
