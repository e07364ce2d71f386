use anyhow::Result;
use rowbeam::error::{ErrorKind, PipelineError, kind_of};
use rowbeam::io::delimited::DelimitedReader;
use rowbeam::io::stream::{ByteStream, Source};
use rowbeam::row::ColumnCount;
use rowbeam::testing::{assert_rows_equal, owned, read_all};

fn reader(parts: &[&str]) -> DelimitedReader {
    DelimitedReader::new(ByteStream::new(
        parts
            .iter()
            .enumerate()
            .map(|(i, p)| Source::from_bytes(format!("part{i}"), *p)),
    ))
}

#[test]
fn fields_are_exact_substrings() -> Result<()> {
    let mut r = reader(&["a,bb,,dddd\nx\n"]);
    let row = r.read_row()?.expect("first row");
    assert_eq!(row.len(), 4);
    assert_eq!(row.max_index(), 3);
    assert_eq!(row.columns(), &[&b"a"[..], &b"bb"[..], &b""[..], &b"dddd"[..]]);

    let row = r.read_row()?.expect("second row");
    assert_eq!(row.max_index(), 0);
    assert_eq!(row.column(0), Some(&b"x"[..]));

    assert!(r.read_row()?.is_none());
    assert!(r.read_row()?.is_none());
    assert_eq!(r.rows_read(), 2);
    Ok(())
}

#[test]
fn last_line_without_newline_is_a_row() -> Result<()> {
    let rows = read_all(&mut reader(&["1,2\n3,4"]))?;
    assert_rows_equal(&rows, &owned(&[&[b"1", b"2"], &[b"3", b"4"]]));
    Ok(())
}

#[test]
fn blank_lines_are_skipped() -> Result<()> {
    let rows = read_all(&mut reader(&["\n\na\n\n\nb\n\n"]))?;
    assert_rows_equal(&rows, &owned(&[&[b"a"], &[b"b"]]));
    Ok(())
}

#[test]
fn sources_are_read_back_to_back() -> Result<()> {
    // a record never spans two sources
    let rows = read_all(&mut reader(&["a,1\nb,2", "c,3\n", "", "d,4\n"]))?;
    assert_rows_equal(
        &rows,
        &owned(&[&[b"a", b"1"], &[b"b", b"2"], &[b"c", b"3"], &[b"d", b"4"]]),
    );
    Ok(())
}

#[test]
fn custom_delimiter() -> Result<()> {
    let mut r = reader(&["a|b,c|d\n"]).with_delimiter(b'|');
    let rows = read_all(&mut r)?;
    assert_rows_equal(&rows, &owned(&[&[b"a", b"b,c", b"d"]]));
    Ok(())
}

#[test]
fn rows_below_the_minimum_are_rejected() -> Result<()> {
    let mut r = reader(&["a,b,c\nd,e\n"]).expect_columns(ColumnCount::AtLeast(3));
    assert!(r.read_row()?.is_some());
    let err = r.read_row().unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::Schema));
    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::ColumnCount { row, found, .. }) => {
            assert_eq!(*row, 2);
            assert_eq!(*found, 2);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    Ok(())
}

#[test]
fn exact_count_rejects_extra_columns() -> Result<()> {
    let mut r = reader(&["a,b\na,b,c\n"]).expect_columns(ColumnCount::Exact(2));
    assert!(r.read_row()?.is_some());
    assert!(r.read_row().is_err());
    Ok(())
}

#[test]
fn long_lines_survive_small_buffers() -> Result<()> {
    let long = "x".repeat(5000);
    let input = format!("{long},{long}\nshort\n");
    let mut r = DelimitedReader::new(ByteStream::with_capacity(
        [Source::from_bytes("big", input)],
        64,
    ));
    let row = r.read_row()?.expect("long row");
    assert_eq!(row.len(), 2);
    assert_eq!(row.column(1).map(<[u8]>::len), Some(5000));
    assert_eq!(r.read_row()?.and_then(|r| r.column(0)), Some(&b"short"[..]));
    Ok(())
}
