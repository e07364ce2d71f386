use anyhow::Result;
use rowbeam::aggregate::{SumAggregator, VALUE_WIDTH};
use rowbeam::error::{ErrorKind, kind_of};
use rowbeam::io::Format;
use rowbeam::io::bsv::BsvReader;
use rowbeam::io::output::RowOutput;
use rowbeam::io::stream::{ByteStream, Source};
use rowbeam::io::writer::RowWriter;
use rowbeam::merge::ZipMerge;
use rowbeam::row::OwnedRow;
use rowbeam::testing::{SharedBuffer, assert_rows_unordered_equal, bsv_bytes, decode_bsv, decode_csv};
use rowbeam::transforms;

fn column(values: &[&[u8]]) -> BsvReader {
    let rows: Vec<&[&[u8]]> = values.iter().map(std::slice::from_ref).collect();
    BsvReader::new(ByteStream::single(Source::from_bytes("col", bsv_bytes(&rows))), 1)
}

fn floats(values: &[f64]) -> Vec<[u8; VALUE_WIDTH]> {
    values.iter().map(|v| v.to_le_bytes()).collect()
}

fn sum_rows(keys: &[&[u8]], values: &[f64], agg: SumAggregator, format: Format) -> Result<Vec<u8>> {
    let values = floats(values);
    let values: Vec<&[u8]> = values.iter().map(|v| &v[..]).collect();
    let mut merge = ZipMerge::new(vec![column(keys), column(&values)])?;
    let out = SharedBuffer::new();
    let mut rows = RowOutput::new(RowWriter::new(vec![out.sink("mem")]), format, b',');
    transforms::zip_sum(&mut merge, agg, &mut rows)?;
    rows.finish()?;
    Ok(out.bytes())
}

#[test]
fn each_key_is_dumped_once_with_its_sum() -> Result<()> {
    let bytes = sum_rows(&[b"a", b"a", b"b"], &[1.0, 2.0, 5.0], SumAggregator::new(), Format::Bsv)?;
    let expected = vec![
        OwnedRow::new([&b"a"[..], &3.0f64.to_le_bytes()[..]]),
        OwnedRow::new([&b"b"[..], &5.0f64.to_le_bytes()[..]]),
    ];
    assert_rows_unordered_equal(&decode_bsv(&bytes, 2)?, &expected);
    Ok(())
}

#[test]
fn text_output_renders_sums_as_decimals() -> Result<()> {
    let bytes = sum_rows(
        &[b"x", b"y", b"x"],
        &[0.5, -2.0, 1.25],
        SumAggregator::new(),
        Format::Csv,
    )?;
    let expected = vec![OwnedRow::new(["x", "1.75"]), OwnedRow::new(["y", "-2"])];
    assert_rows_unordered_equal(&decode_csv(&bytes)?, &expected);
    Ok(())
}

#[test]
fn key_width_groups_on_a_prefix() -> Result<()> {
    let bytes = sum_rows(
        &[b"2019-01-01", b"2019-01-31", b"2019-02-03", b"2019"],
        &[1.0, 2.0, 4.0, 8.0],
        SumAggregator::new().with_key_width(7),
        Format::Csv,
    )?;
    let expected = vec![
        OwnedRow::new(["2019-01", "3"]),
        OwnedRow::new(["2019-02", "4"]),
        OwnedRow::new(["2019", "8"]),
    ];
    assert_rows_unordered_equal(&decode_csv(&bytes)?, &expected);
    Ok(())
}

#[test]
fn value_column_must_be_eight_bytes() -> Result<()> {
    let mut merge = ZipMerge::new(vec![column(&[b"a"]), column(&[b"1.0"])])?;
    let out = SharedBuffer::new();
    let mut rows = RowOutput::new(RowWriter::new(vec![out.sink("mem")]), Format::Bsv, b',');
    let err = transforms::zip_sum(&mut merge, SumAggregator::new(), &mut rows).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::Schema));
    Ok(())
}

#[test]
fn a_single_source_cannot_be_summed() -> Result<()> {
    let mut merge = ZipMerge::new(vec![column(&[b"a"])])?;
    let out = SharedBuffer::new();
    let mut rows = RowOutput::new(RowWriter::new(vec![out.sink("mem")]), Format::Bsv, b',');
    let err = transforms::zip_sum(&mut merge, SumAggregator::new(), &mut rows).unwrap_err();
    assert_eq!(kind_of(&err), Some(ErrorKind::Schema));
    assert!(out.is_empty());
    Ok(())
}

#[test]
fn keys_are_copied_out_of_the_read_buffer() -> Result<()> {
    // a tiny read buffer forces the key bytes to be overwritten between rows
    let keys: Vec<Vec<u8>> = (0..200).map(|i| format!("key{}", i % 7).into_bytes()).collect();
    let key_rows: Vec<Vec<&[u8]>> = keys.iter().map(|k| vec![&k[..]]).collect();
    let key_rows: Vec<&[&[u8]]> = key_rows.iter().map(Vec::as_slice).collect();
    let one = 1.0f64.to_le_bytes();
    let one_row: [&[u8]; 1] = [&one[..]];
    let value_rows: Vec<&[&[u8]]> = (0..200).map(|_| &one_row[..]).collect();

    let small = |bytes: Vec<u8>| {
        BsvReader::new(ByteStream::with_capacity([Source::from_bytes("s", bytes)], 16), 1)
    };
    let mut merge = ZipMerge::new(vec![small(bsv_bytes(&key_rows)), small(bsv_bytes(&value_rows))])?;

    let mut agg = SumAggregator::new();
    while let Some(row) = merge.next_row()? {
        agg.add_row(&row)?;
    }
    assert_eq!(agg.len(), 7);
    assert_eq!(agg.rows(), 200);
    let total: f64 = agg.iter().map(|(_, sum)| sum).sum();
    assert_eq!(total, 200.0);
    assert_eq!(agg.get(b"key0"), Some(29.0));
    Ok(())
}
