#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const ADVERTS: &str = "\
id,job_title_raw,created,occupation,job_location_raw,profession
1,Nursery Nurse,2022-03-10,Childcare,Leeds LS1,Early Years Practitioner
2,Nursery Practitioner,2022-03-11,Childcare,Camden,Early Years Practitioner
3,Nursery Assistant,2022-04-02,Childcare,Leeds LS2,Early Years Practitioner
4,Room Leader,2022-04-05,Childcare,Leeds LS3,Early Years Practitioner
5,Nursery Nurse,2022-03-10,Childcare,Leeds LS9,Early Years Practitioner
6,Nursery Manager,2022-05-01,Childcare,Leeds,Early Years Practitioner
7,Waiter,2020-01-01,Hospitality,Leeds,Waiter
8,Class Teacher,2022-05-02,Education,Cardiff,Primary School
9,Teaching Role,2022-06-01,Education,Leeds,Primary School
10,Astronaut,2022-06-01,,Leeds,Astronaut
";

pub const DESCRIPTIONS: &str = "\
id,description
1,Requires NVQ 3
2,<p>Must hold a <b>degree</b></p>
3,No quals needed
4,NVQ Level 2 or NVQ Level 3
5,Requires NVQ 3
6,PGCE required
9,QTS essential
";

pub const SALARIES: &str = "\
id,min_annualised_salary,max_annualised_salary
1,20000,22000
1,99999,99999
2,25000,
3,abc,
4,21000,23000
9,28000,32000
";

pub const LOCATIONS: &str = "\
id,job_location_raw,itl_3_code,itl_3_name,itl_2_name,itl_1_code
1,Leeds,TLE42,Leeds,West Yorkshire,TLE
2,Camden,TLI31,Camden and City of London,Inner London - West,TLI
3,Leeds,TLE42,Leeds,West Yorkshire,TLE
4,Leeds,TLE42,Leeds,West Yorkshire,TLE
5,Leeds,TLE42,Leeds,West Yorkshire,TLE
6,Leeds,TLE42,Leeds,West Yorkshire,TLE
7,Leeds,TLE42,Leeds,West Yorkshire,TLE
8,Cardiff,TLL22,Cardiff and Vale of Glamorgan,East Wales,TLL
9,Leeds,TLE42,Leeds,West Yorkshire,TLE
10,Leeds,TLE42,Leeds,West Yorkshire,TLE
";

pub const SKILLS: &str = "\
id,skill_id,skill_label
1,S1,Childcare
1,S2,Communication
5,S1,Childcare
7,S3,Customer Service
9,S4,Lesson Planning
";

pub const RURAL_URBAN: &str = "\
NUTS315CD,NUTS315NM,RUC11CD,RUC11,Broad_RUC11
UKE42,Leeds,UN1,Urban with Minor Conurbation,Predominantly Urban
UKI31,Camden and City of London,UM1,Urban with Major Conurbation,Predominantly Urban
UKI32,Westminster,UM1,Urban with Major Conurbation,Predominantly Urban
UKL22,Cardiff and Vale of Glamorgan,UN1,Urban with City and Town,Predominantly Urban
";

/// A workspace with every input table and a config pointing at them.
/// `extra` is appended to the config file.
pub fn setup_workspace(extra: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();

    let data = root.join("data");
    fs::create_dir_all(&data).unwrap();
    fs::write(data.join("adverts.csv"), ADVERTS).unwrap();
    fs::write(data.join("descriptions.csv"), DESCRIPTIONS).unwrap();
    fs::write(data.join("salaries.csv"), SALARIES).unwrap();
    fs::write(data.join("locations.csv"), LOCATIONS).unwrap();
    fs::write(data.join("skills.csv"), SKILLS).unwrap();
    fs::write(data.join("rural_urban.csv"), RURAL_URBAN).unwrap();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let config = format!(
        r#"[inputs]
adverts = "{root}/data/adverts.csv"
descriptions = "{root}/data/descriptions.csv"
salaries = "{root}/data/salaries.csv"
locations = "{root}/data/locations.csv"
skills = "{root}/data/skills.csv"
rural_urban = "{root}/data/rural_urban.csv"

[output]
dir = "{root}/out"

{extra}
"#,
        root = root.display(),
        extra = extra
    );
    let config_path = config_dir.join("eyla.toml");
    fs::write(&config_path, config).unwrap();

    (tmp, config_path)
}
