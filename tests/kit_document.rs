//! File-backed build of a small two-channel kit, checked through the emitted document.

use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use ladderkit::config::KitConfig;
use ladderkit::document::{ChannelMap, KitDocument};
use ladderkit::records::{self, AlleleRecord, AnchorRecord, LocusRecord};
use ladderkit::LadderError;

const CONFIG: &str = r#"
marker_set_name = "Example4"
suffix = "EX4"

[ils]
names = ["ILS600"]
channel = 2

[[channels]]
kit_channel = 1
fsa_channel = 1
color = "blue"
dye = "FL"

[[channels]]
kit_channel = 2
fsa_channel = 4
color = "orange"
dye = "CC5"
"#;

const LOCI: &str = "\
locus\tchannel\tcore_repeat\ty_linked\tmin_expected_alleles\tmax_expected_alleles
D3S1358\t1\t4\t\t\t
TH01\t1\t4\t\t\t
Penta E\t1\t5\t\t\t
DYS391\t2\t4\ttrue\t0\t1
";

const ALLELES: &str = "\
locus\tallele\tcurve\tvirtual\trelative_height
D3S1358\t12\t1\t\t
D3S1358\t13\t1\t\t
D3S1358\t14\t1\t\t
TH01\t6\t2\t\t
TH01\t9.3\t2\t\tH
TH01\t10\t2\t\t
Penta E\t5\t3\t\t
Penta E\t10\t3\t\t
DYS391\t10\t4\t\t
DYS391\t10\t4\t\t
";

const ANCHORS: &str = "\
locus,channel,core_repeat,first_core_bp,first_extended,last_extended,min_search_bp,max_search_bp
D3S1358,1,4,100,10,20,100,110
TH01,1,4,150,3,13.3,109,160
Penta E,1,5,370,5,24,300,450
DYS391,2,4,200,6,14,190,230
";

struct Inputs {
    _dir: TempDir,
    config: PathBuf,
    loci: PathBuf,
    alleles: PathBuf,
    anchors: PathBuf,
}

fn write_inputs() -> Inputs {
    let dir = TempDir::new().expect("failed to create temp dir");
    let put = |name: &str, body: &str| {
        let p = dir.path().join(name);
        fs::write(&p, body).unwrap();
        p
    };
    Inputs {
        config: put("kit.toml", CONFIG),
        loci: put("loci.tsv", LOCI),
        alleles: put("alleles.tsv", ALLELES),
        anchors: put("anchors.csv", ANCHORS),
        _dir: dir,
    }
}

fn build(inputs: &Inputs, out: &Path, allow_unmerged: bool) -> ladderkit::Result<ladderkit::merge::MergeReport> {
    let config = KitConfig::load(&inputs.config)?;
    let loci: Vec<LocusRecord> = records::read_table_file(&inputs.loci)?;
    let alleles: Vec<AlleleRecord> = records::read_table_file(&inputs.alleles)?;
    let anchors: Vec<AnchorRecord> = records::read_table_file(&inputs.anchors)?;

    let mut target = records::assemble_ladder(&config, &loci, &alleles);
    let source = records::assemble_anchor_ladder(&config, &anchors);
    assert_eq!(target.rejected.len(), 1, "the repeated DYS391 allele is rejected");

    ladderkit::write_kit_file(&config, &mut target.ladder, &source.ladder, out, allow_unmerged)
}

#[test]
fn builds_kit_document_from_tables() {
    let inputs = write_inputs();
    let out = inputs._dir.path().join("kit.xml");
    let report = build(&inputs, &out, false).unwrap();
    assert_eq!(report.merged.len(), 4);
    assert_eq!(report.repaired, vec![("D3S1358".to_string(), "TH01".to_string())]);

    let xml = fs::read_to_string(&out).unwrap();
    let doc = KitDocument::from_xml_str(&xml).unwrap();
    let set = doc.set();
    assert_eq!(set.name, "Example4");
    assert_eq!(set.n_channels, 2);
    assert_eq!(set.ls.names, vec!["ILS600".to_string()]);
    assert_eq!(set.ls.channel, 2);
    assert_eq!(set.file_name_suffix, "EX4");

    let names: Vec<&str> = set.loci.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["D3S1358", "TH01", "Penta E", "DYS391"]);

    // D3S1358 [100,110] and TH01 [109,160] overlap once widened; padded originals cross.
    let d3 = doc.locus("D3S1358").unwrap();
    let th01 = doc.locus("TH01").unwrap();
    assert_eq!((d3.min_grid_ls_bp, d3.max_grid_ls_bp), (97.0, 109.5));
    assert_eq!(th01.min_grid_ls_bp, 109.5);
    assert!(d3.max_grid_ls_bp <= th01.min_grid_ls_bp);

    // TH01 [109,160] widened to [106,163]; Penta E [300,450] widened to [296,454]: no overlap.
    let penta = doc.locus("Penta E").unwrap();
    assert_eq!(th01.max_grid_ls_bp, 163.0);
    assert_eq!((penta.min_grid_ls_bp, penta.max_grid_ls_bp), (296.0, 454.0));
    assert_eq!(penta.core_repeat, Some(5));

    let bps: Vec<(&str, i32)> = th01.alleles.alleles.iter().map(|a| (a.name.as_str(), a.bp)).collect();
    assert_eq!(bps, vec![("6", 150), ("9.3", 165), ("10", 166)]);
    assert_eq!(th01.alleles.alleles[1].relative_height.as_deref(), Some("H"));
    assert_eq!((th01.min_bp, th01.max_bp), (138, 181));

    let dys = doc.locus("DYS391").unwrap();
    assert_eq!(dys.y_linked, Some(true));
    assert_eq!(dys.min_expected_alleles, Some(0));
    assert_eq!(dys.max_expected_alleles, Some(1));
    assert_eq!(dys.alleles.alleles.len(), 1);
}

#[test]
fn channel_map_survives_the_round_trip() {
    let inputs = write_inputs();
    let out = inputs._dir.path().join("kit.xml");
    build(&inputs, &out, false).unwrap();

    let config = KitConfig::load(&inputs.config).unwrap();
    let doc = KitDocument::from_xml_str(&fs::read_to_string(&out).unwrap()).unwrap();
    let map = &doc.set().channel_map;
    assert_eq!(map.channels.len(), 2);
    for i in 1..=config.number_of_channels() {
        assert_eq!(map.fsa_channel_for_kit_channel(i), config.fsa_channel_for_kit_channel(i));
        assert_eq!(map.color_name(i), config.color_name(i));
        assert_eq!(map.dye_name(i), config.dye_name(i));
    }
}

#[test]
fn missing_anchor_fails_the_build() {
    let inputs = write_inputs();
    fs::write(&inputs.anchors, ANCHORS.lines().take(4).collect::<Vec<_>>().join("\n")).unwrap();
    let out = inputs._dir.path().join("kit.xml");
    let err = build(&inputs, &out, false).unwrap_err();
    assert!(matches!(err, LadderError::IncompleteMerge(ref m) if m == &vec!["DYS391".to_string()]), "{err}");
    assert!(!out.exists(), "a failed build must not leave a kit file behind");

    build(&inputs, &out, true).unwrap();
    let doc = KitDocument::from_xml_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(doc.set().loci.len(), 4);
}
