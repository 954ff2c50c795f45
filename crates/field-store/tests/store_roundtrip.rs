//! End-to-end tests: write fields, close, reopen and read them back.

use field_store::{
    DataType, FieldFilter, FieldKey, FieldMeta, FieldStore, OpenMode, StoreConfig,
};
use test_utils::{
    all_i16_values, create_noise_f32, create_ramp_f32, create_temperature_grid, f32_le_bytes,
    fixtures::{labels, levels, names, shapes, time},
    init_test_tracing, store_path, temp_test_dir,
};

fn meta(nomvar: &str, shape: (i32, i32, i32), ip1: i32) -> FieldMeta {
    FieldMeta::new(nomvar, shape)
        .with_level(ip1)
        .with_time(time::ORIGIN_2024_01_15_12Z, time::HOURLY_STEP, 6)
        .with_etiket(labels::ANALYSIS)
}

#[test]
fn test_write_find_read_named_fields() {
    init_test_tracing();
    let dir = temp_test_dir();
    let path = store_path(dir.path(), "abc");

    let payloads: Vec<(&str, i32, Vec<f32>)> = vec![
        ("A", levels::HPA_1000, create_ramp_f32(shapes::len(shapes::TINY), 1.0, 0.5)),
        ("B", levels::HPA_850, create_ramp_f32(shapes::len(shapes::TINY), -40.0, 1.25)),
        ("C", levels::HPA_500, create_ramp_f32(shapes::len(shapes::TINY), 1000.0, -3.0)),
    ];

    let mut store = FieldStore::open(&[&path], OpenMode::write_only()).unwrap();
    for (name, level, values) in &payloads {
        store
            .write_bytes(
                &f32_le_bytes(values),
                DataType::Float32,
                &meta(name, shapes::TINY, *level),
            )
            .unwrap();
    }
    store.close().unwrap();

    let store = FieldStore::open(&[&path], OpenMode::read_only()).unwrap();
    assert_eq!(store.len(), 3);
    assert!(store.file(0).unwrap().is_mapped());

    let key = store
        .find(&FieldFilter::new().nomvar("B").ip1(levels::HPA_850))
        .expect("B should be found");
    assert!(key.is_valid());
    assert_eq!(key.slot(), 1);
    assert_eq!(store.read(key).unwrap(), f32_le_bytes(&payloads[1].2));

    // Mapped bytes are the same stored bytes
    assert_eq!(
        store.mapped_bytes(key).unwrap(),
        Some(&f32_le_bytes(&payloads[1].2)[..])
    );

    // Wrong level for B
    assert!(store
        .find(&FieldFilter::new().nomvar("B").ip1(levels::HPA_500))
        .is_none());
    store.close().unwrap();
}

#[test]
fn test_metadata_survives_reopen() {
    let dir = temp_test_dir();
    let path = store_path(dir.path(), "meta");

    let written = meta(names::FULL_WIDTH, shapes::SMALL, levels::HPA_250)
        .with_ips(levels::HPA_250, 12, 3)
        .with_typvar("A")
        .with_etiket(labels::FULL_WIDTH)
        .with_grid("Z", [10, 20, 30, 40]);
    let values = create_temperature_grid(32, 16);

    let mut store = FieldStore::open(&[&path], OpenMode::write_only()).unwrap();
    store.write(&values, DataType::Float32, &written).unwrap();
    store.close().unwrap();

    let store = FieldStore::open(&[&path], OpenMode::read_only()).unwrap();
    let (key, header) = store.fields().next().unwrap();
    assert_eq!(header.meta(), written);
    assert_eq!(header.nbits, 32);
    assert_eq!(header.nbytes, (values.len() * 4) as i64);
    assert_eq!(store.read_values::<f32>(key).unwrap(), values);
}

#[test]
fn test_find_all_in_write_order() {
    let dir = temp_test_dir();
    let path = store_path(dir.path(), "order");

    let mut store = FieldStore::open(&[&path], OpenMode::write_only()).unwrap();
    for step in time::STEPS {
        let m = FieldMeta::new(names::TEMPERATURE, shapes::TINY).with_time(
            time::ORIGIN_2024_01_15_12Z,
            time::HOURLY_STEP,
            step,
        );
        store
            .write(&vec![step; shapes::len(shapes::TINY)], DataType::Int32, &m)
            .unwrap();
    }
    store.close().unwrap();

    let store = FieldStore::open(&[&path], OpenMode::read_only()).unwrap();
    let keys = store.find_all(&FieldFilter::new().nomvar(names::TEMPERATURE));
    let steps: Vec<i32> = keys
        .iter()
        .map(|&k| store.header(k).unwrap().npas)
        .collect();
    assert_eq!(steps, time::STEPS.to_vec());

    // Validity time: origin + 12 hours
    let datev = i64::from(time::ORIGIN_2024_01_15_12Z) + 12 * i64::from(time::HOURLY_STEP);
    let key = store.find(&FieldFilter::new().datev(datev)).unwrap();
    assert_eq!(store.read_values::<i32>(key).unwrap()[0], 12);
}

#[test]
fn test_injected_validity_function() {
    let dir = temp_test_dir();
    let path = store_path(dir.path(), "validity");

    let mut store = FieldStore::open(&[&path], OpenMode::write_only()).unwrap();
    for step in [0, 6] {
        let m = FieldMeta::new(names::HEIGHT, shapes::TINY).with_time(0, 3600, step);
        store
            .write(&vec![0i16; shapes::len(shapes::TINY)], DataType::Int16, &m)
            .unwrap();
    }
    store.close().unwrap();

    // Validity in hours
    let store = FieldStore::open(&[&path], OpenMode::read_only())
        .unwrap()
        .with_validity(std::sync::Arc::new(|dateo: i32, deet: i32, npas: i32| {
            (i64::from(dateo) + i64::from(deet) * i64::from(npas)) / 3600
        }));
    let key = store.find(&FieldFilter::new().datev(6)).unwrap();
    assert_eq!(key.slot(), 1);
}

#[test]
fn test_linked_files_scan_in_given_order() {
    let dir = temp_test_dir();
    let first = store_path(dir.path(), "first");
    let second = store_path(dir.path(), "second");

    let mut store = FieldStore::open(&[&first], OpenMode::write_only()).unwrap();
    store
        .write(&[1.0f64, 2.0], DataType::Float64, &FieldMeta::new("ONE1", (2, 1, 1)))
        .unwrap();
    store
        .write(&[3.0f64, 4.0], DataType::Float64, &FieldMeta::new("BOTH", (2, 1, 1)))
        .unwrap();
    store.close().unwrap();

    let mut store = FieldStore::open(&[&second], OpenMode::write_only()).unwrap();
    store
        .write(&[5.0f64, 6.0], DataType::Float64, &FieldMeta::new("BOTH", (2, 1, 1)))
        .unwrap();
    store
        .write(&[7.0f64, 8.0], DataType::Float64, &FieldMeta::new("TWO2", (2, 1, 1)))
        .unwrap();
    store.close().unwrap();

    let store = FieldStore::open(&[&first, &second], OpenMode::read_only()).unwrap();
    assert_eq!(store.file_count(), 2);
    assert_eq!(store.len(), 4);

    let key = store.find(&FieldFilter::new().nomvar("TWO2")).unwrap();
    assert_eq!(key.file_index(), 1);
    assert_eq!(key.slot(), 1);
    assert_eq!(store.read_values::<f64>(key).unwrap(), vec![7.0, 8.0]);

    // The first file wins
    let key = store.find(&FieldFilter::new().nomvar("BOTH")).unwrap();
    assert_eq!(key, FieldKey::new(0, 1).unwrap());

    let all = store.find_all(&FieldFilter::new().nomvar("BOTH"));
    assert_eq!(all, vec![FieldKey::new(0, 1).unwrap(), FieldKey::new(1, 0).unwrap()]);
}

#[test]
fn test_open_matching_links_sorted_paths() {
    let dir = temp_test_dir();
    for (name, value) in [("run_b", 2u16), ("run_a", 1u16)] {
        let path = store_path(dir.path(), name);
        let mut store = FieldStore::open(&[&path], OpenMode::write_only()).unwrap();
        store
            .write(&[value], DataType::UInt16, &FieldMeta::new(names::PRESSURE, (1, 1, 1)))
            .unwrap();
        store.close().unwrap();
    }

    let pattern = dir.path().join("run_*.fst");
    let store = FieldStore::open_matching(
        pattern.to_str().unwrap(),
        OpenMode::read_only(),
        StoreConfig::default(),
    )
    .unwrap();
    assert_eq!(store.file_count(), 2);
    assert!(store.file(0).unwrap().path().ends_with("run_a.fst"));

    let keys = store.find_all(&FieldFilter::new().nomvar(names::PRESSURE));
    let values: Vec<u16> = keys
        .iter()
        .map(|&k| store.read_values::<u16>(k).unwrap()[0])
        .collect();
    assert_eq!(values, vec![1, 2]);

    let missing = dir.path().join("none_*.fst");
    let err = FieldStore::open_matching(
        missing.to_str().unwrap(),
        OpenMode::read_only(),
        StoreConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, field_store::StoreError::Config(_)));
}

#[test]
fn test_int16_read_as_float64() {
    let dir = temp_test_dir();
    let path = store_path(dir.path(), "int16");
    let values = all_i16_values();
    let shape = (256, 256, 1);

    let mut store = FieldStore::open(&[&path], OpenMode::write_only()).unwrap();
    store
        .write(&values, DataType::Int16, &FieldMeta::new("I16", shape))
        .unwrap();
    store.close().unwrap();

    let store = FieldStore::open(&[&path], OpenMode::read_only()).unwrap();
    let key = store.find(&FieldFilter::new().nomvar("I16")).unwrap();

    let as_f64: Vec<f64> = store.read_values(key).unwrap();
    let expected: Vec<f64> = values.iter().map(|&v| f64::from(v)).collect();
    assert_eq!(as_f64, expected);

    let bytes = store.read_as(key, DataType::Float64).unwrap();
    assert_eq!(bytes.len(), values.len() * 8);
}

#[test]
fn test_compressed_fields_round_trip_through_files() {
    init_test_tracing();
    let dir = temp_test_dir();
    let path = store_path(dir.path(), "compressed");

    let smooth = create_temperature_grid(200, 150);
    let noise = create_noise_f32(shapes::len(shapes::REGIONAL), 7);

    let mut store = FieldStore::open(&[&path], OpenMode::write_only()).unwrap();
    let smooth_key = store
        .write(
            &smooth,
            DataType::Float32Compressed,
            &FieldMeta::new("SMTH", shapes::REGIONAL),
        )
        .unwrap();
    let noise_key = store
        .write_bytes(
            &f32_le_bytes(&noise),
            DataType::Float32Compressed,
            &FieldMeta::new("NOIS", shapes::REGIONAL),
        )
        .unwrap();
    store.close().unwrap();

    for config in [
        StoreConfig::default(),
        StoreConfig {
            use_mmap: false,
            ..StoreConfig::default()
        },
    ] {
        let store = FieldStore::open_with_config(&[&path], OpenMode::read_only(), config).unwrap();

        let header = store.header(smooth_key).unwrap();
        assert_eq!(header.datyp, DataType::Float32Compressed);
        assert!((header.nbytes as usize) < smooth.len() * 4);
        assert_eq!(store.read_values::<f32>(smooth_key).unwrap(), smooth);

        // Incompressible data falls back to the plain type
        let header = store.header(noise_key).unwrap();
        assert_eq!(header.datyp, DataType::Float32);
        assert_eq!(header.nbytes as usize, noise.len() * 4);
        let restored: Vec<u32> = store
            .read_values::<f32>(noise_key)
            .unwrap()
            .iter()
            .map(|v| v.to_bits())
            .collect();
        let original: Vec<u32> = noise.iter().map(|v| v.to_bits()).collect();
        assert_eq!(restored, original);
    }
}

#[test]
fn test_read_write_session_appends() {
    let dir = temp_test_dir();
    let path = store_path(dir.path(), "append");

    let mut store = FieldStore::open(&[&path], OpenMode::write_only()).unwrap();
    store
        .write(&[1i64, 2, 3], DataType::Int64, &FieldMeta::new("OLD", (3, 1, 1)))
        .unwrap();
    store.close().unwrap();

    let mut store = FieldStore::open(&[&path], OpenMode::read_write()).unwrap();
    assert_eq!(store.len(), 1);
    let key = store
        .write(&[4i64, 5, 6], DataType::Int64, &FieldMeta::new("NEW", (3, 1, 1)))
        .unwrap();
    assert_eq!(key.slot(), 1);
    store.close().unwrap();

    let store = FieldStore::open(&[&path], OpenMode::read_only()).unwrap();
    assert_eq!(store.len(), 2);
    let old = store.find(&FieldFilter::new().nomvar("OLD")).unwrap();
    let new = store.find(&FieldFilter::new().nomvar("NEW")).unwrap();
    assert_eq!(store.read_values::<i64>(old).unwrap(), vec![1, 2, 3]);
    assert_eq!(store.read_values::<i64>(new).unwrap(), vec![4, 5, 6]);
    store.close().unwrap();

    // Clearing discards previous content
    let store = FieldStore::open(&[&path], OpenMode::read_write().cleared()).unwrap();
    assert!(store.is_empty());
    store.close().unwrap();
}

#[test]
fn test_read_write_session_without_writes_leaves_file_intact() {
    let dir = temp_test_dir();
    let path = store_path(dir.path(), "untouched");

    let mut store = FieldStore::open(&[&path], OpenMode::write_only()).unwrap();
    store
        .write(&b"hello"[..], DataType::String, &FieldMeta::new("TXT", (5, 1, 1)))
        .unwrap();
    store.close().unwrap();
    let before = std::fs::read(&path).unwrap();

    let store = FieldStore::open(&[&path], OpenMode::read_write()).unwrap();
    drop(store);
    assert_eq!(std::fs::read(&path).unwrap(), before);

    let store = FieldStore::open(&[&path], OpenMode::read_only()).unwrap();
    let key = store.find(&FieldFilter::new().nomvar("TXT")).unwrap();
    assert_eq!(store.read(key).unwrap(), b"hello".to_vec());
}

#[test]
fn test_write_rejected_on_read_only_session() {
    let dir = temp_test_dir();
    let path = store_path(dir.path(), "ro");

    let store = FieldStore::open(&[&path], OpenMode::write_only()).unwrap();
    store.close().unwrap();

    let mut store = FieldStore::open(&[&path], OpenMode::read_only()).unwrap();
    let err = store
        .write(&[1u8], DataType::UInt8, &FieldMeta::new("X", (1, 1, 1)))
        .unwrap_err();
    assert!(matches!(err, field_store::StoreError::ReadOnly { .. }));
}
