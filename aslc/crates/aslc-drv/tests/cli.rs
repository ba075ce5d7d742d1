//! End-to-end tests of the `aslc` binary against small XML trees.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn write_file(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

fn aslc() -> Command {
    Command::cargo_bin("aslc").unwrap()
}

const SHARED: &str = r#"<root>
<ps name="shared/functions/common" mylink="shared.functions.common" enclabels="" sections="1" secttype="Library">
<pstext mayhavelinks="1" section="Functions" rep_section="functions">constant integer <anchor link="impl-MAX" hover="max">MAX</anchor> = 32;

integer <anchor link="impl-UInt" hover="uint">UInt</anchor>(bits(N) x)
    return 0;

bits(32) <anchor link="impl-R" hover="r">_R</anchor>[integer n];</pstext>
</ps>
</root>"#;

const OPERATION: &str = r#"<root>
<ps name="aarch32/instrs/ADD_i/t1.txt" mylink="commonps" enclabels="" sections="1" secttype="Operation">
<pstext mayhavelinks="1" section="Execute" rep_section="execute">if ConditionPassed() then
    result = <a link="impl-UInt" hover="uint">UInt</a>(imm32);
    <a link="impl-R" hover="r">_R</a>[d] = result&lt;31:0&gt;;</pstext>
</ps>
</root>"#;

const DECODE: &str = r#"<root>
<ps name="aarch32/instrs/ADD_i/t1_dec.txt" mylink="aarch32.instrs.ADD_i.t1_dec.txt" enclabels="" sections="1" secttype="noheading">
<pstext mayhavelinks="1" section="Decode" rep_section="decode">d = <a link="impl-UInt" hover="uint">UInt</a>(Rd);  constant integer imm32 = 4;</pstext>
</ps>
</root>"#;

const BROKEN: &str = r#"<root>
<ps name="aarch32/instrs/BAD/t1.txt" mylink="commonps" enclabels="" sections="1" secttype="Operation">
<pstext mayhavelinks="1" section="Execute" rep_section="execute">x = @;</pstext>
</ps>
</root>"#;

#[test]
fn test_parses_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "shared_pseudocode.xml", SHARED);
    write_file(dir.path(), "add_i.xml", OPERATION);
    write_file(dir.path(), "add_i_dec.xml", DECODE);

    aslc().arg(dir.path()).assert().success();
}

#[test]
fn test_skips_dotfiles_and_onebigfile() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "shared_pseudocode.xml", SHARED);
    write_file(dir.path(), "add_i.xml", OPERATION);
    // both of these are malformed, but must never be read
    write_file(dir.path(), ".hidden.xml", "not xml at all <<<");
    write_file(dir.path(), "onebigfile.xml", "not xml at all <<<");
    write_file(dir.path(), "notes.txt", "not xml either");

    aslc().arg(dir.path()).assert().success();
}

#[test]
fn test_lex_error_fails_with_caret() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "bad.xml", BROKEN);

    aslc()
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"))
        .stderr(predicate::str::contains("^"));
}

#[test]
fn test_parse_error_is_reported_with_line() {
    let broken = r#"<root>
<ps name="aarch32/instrs/BAD/t1.txt" mylink="commonps" enclabels="" sections="1" secttype="Operation">
<pstext mayhavelinks="1" section="Execute" rep_section="execute">x = ;</pstext>
</ps>
</root>"#;
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "bad.xml", broken);

    aslc()
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains(": error:"));
}

#[test]
fn test_error_in_one_file_does_not_stop_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "bad.xml", BROKEN);
    write_file(dir.path(), "shared_pseudocode.xml", SHARED);
    write_file(dir.path(), "add_i.xml", OPERATION);

    // still fails overall, but reports exactly one failing fragment
    aslc()
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 fragment(s) failed to parse"));
}

#[test]
fn test_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");
    aslc()
        .arg(&missing)
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read directory"));
}
