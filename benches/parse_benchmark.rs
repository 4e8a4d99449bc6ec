use collada_loader::{DocumentCollector, ErrorCollector, Loader};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::fs;
use std::io::Cursor;
use tempfile::TempDir;
use url::Url;

/// Generate a COLLADA document with one grid mesh
///
/// The grid is `side` by `side` vertices; `polylist` selects quads in a
/// `<polylist>` over triangles in a `<triangles>`.
fn generate_dae(side: usize, polylist: bool) -> String {
    let mut positions = String::with_capacity(side * side * 24);
    for i in 0..side * side {
        let x = (i % side) as f64;
        let y = (i / side) as f64;
        positions.push_str(&format!("{} {} 0 ", x, y));
    }

    let cells = (side - 1) * (side - 1);
    let mut p = String::with_capacity(cells * 40);
    let mut vcount = String::new();
    for row in 0..side - 1 {
        for column in 0..side - 1 {
            let a = row * side + column;
            let b = a + 1;
            let c = a + side + 1;
            let d = a + side;
            if polylist {
                p.push_str(&format!("{} {} {} {} ", a, b, c, d));
                vcount.push_str("4 ");
            } else {
                p.push_str(&format!("{} {} {} {} {} {} ", a, b, c, a, c, d));
            }
        }
    }

    let primitive = if polylist {
        format!(
            r##"<polylist count="{}" material="grid">
        <input semantic="VERTEX" source="#grid-verts" offset="0"/>
        <vcount>{}</vcount>
        <p>{}</p>
      </polylist>"##,
            cells, vcount, p
        )
    } else {
        format!(
            r##"<triangles count="{}" material="grid">
        <input semantic="VERTEX" source="#grid-verts" offset="0"/>
        <p>{}</p>
      </triangles>"##,
            cells * 2,
            p
        )
    };

    format!(
        r##"<?xml version="1.0" encoding="utf-8"?>
<COLLADA xmlns="http://www.collada.org/2005/11/COLLADASchema" version="1.4.1">
  <asset><up_axis>Z_UP</up_axis></asset>
  <library_geometries>
    <geometry id="grid">
      <mesh>
        <source id="grid-pos">
          <float_array id="grid-pos-array" count="{count}">{positions}</float_array>
          <technique_common>
            <accessor source="#grid-pos-array" count="{vertices}" stride="3">
              <param name="X" type="float"/><param name="Y" type="float"/><param name="Z" type="float"/>
            </accessor>
          </technique_common>
        </source>
        <vertices id="grid-verts"><input semantic="POSITION" source="#grid-pos"/></vertices>
      {primitive}
      </mesh>
    </geometry>
  </library_geometries>
  <library_visual_scenes>
    <visual_scene id="scene">
      <node id="grid-node"><instance_geometry url="#grid"/></node>
    </visual_scene>
  </library_visual_scenes>
  <scene><instance_visual_scene url="#scene"/></scene>
</COLLADA>"##,
        count = side * side * 3,
        vertices = side * side,
        positions = positions,
        primitive = primitive,
    )
}

fn load(xml: &[u8], base: &Url) -> DocumentCollector {
    let mut loader = Loader::default();
    let mut document = DocumentCollector::new();
    let mut errors = ErrorCollector::new();
    assert!(loader.load_from_reader(Cursor::new(xml.to_vec()), base, &mut document, &mut errors));
    document
}

fn bench_parse_triangles(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_triangles");
    let base = Url::parse("file:///bench/grid.dae").unwrap();

    for &side in &[10, 50, 100] {
        let xml = generate_dae(side, false).into_bytes();
        group.bench_with_input(
            BenchmarkId::new("grid", format!("{}x{}", side, side)),
            &xml,
            |b, xml| {
                b.iter(|| black_box(load(xml, &base)));
            },
        );
    }

    group.finish();
}

fn bench_parse_polylist(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_polylist");
    let base = Url::parse("file:///bench/grid.dae").unwrap();

    for &side in &[10, 50, 100] {
        let xml = generate_dae(side, true).into_bytes();
        group.bench_with_input(
            BenchmarkId::new("grid", format!("{}x{}", side, side)),
            &xml,
            |b, xml| {
                b.iter(|| black_box(load(xml, &base)));
            },
        );
    }

    group.finish();
}

fn bench_parse_large(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_large");
    group.sample_size(10); // Reduce sample size for large files
    let base = Url::parse("file:///bench/grid.dae").unwrap();

    for &side in &[300, 500] {
        let xml = generate_dae(side, false).into_bytes();
        group.bench_with_input(
            BenchmarkId::new("grid", format!("{}x{}", side, side)),
            &xml,
            |b, xml| {
                b.iter(|| black_box(load(xml, &base)));
            },
        );
    }

    group.finish();
}

fn bench_load_from_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("load_document");
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("grid.dae");
    fs::write(&path, generate_dae(100, false)).unwrap();

    group.bench_function("grid_100x100", |b| {
        b.iter(|| {
            let mut loader = Loader::default();
            let mut document = DocumentCollector::new();
            let mut errors = ErrorCollector::new();
            black_box(loader.load_document(&path, &mut document, &mut errors))
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_parse_triangles,
    bench_parse_polylist,
    bench_parse_large,
    bench_load_from_file
);
criterion_main!(benches);
