//! Property tests for identity derivation and taxonomy ordering

use folio_model::{FolderPath, FolderTaxonomyBuilder, ProjectWorkspaceIdentity, TemplateVariant};
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_year_comes_from_characters_three_and_four(
        prefix in "[A-Z]{2}",
        yy in 0u32..100,
        mm in 1u32..13,
        seq in 0u32..1000,
    ) {
        let number = format!("{prefix}{yy:02}{mm:02}{seq:03}");
        let identity = ProjectWorkspaceIdentity::new(number, "Projeto", "EMP").unwrap();
        prop_assert_eq!(identity.year(), format!("20{yy:02}"));
    }

    #[test]
    fn prop_folder_name_embeds_identity(
        name in "[A-Za-z][A-Za-z0-9 ]{0,30}",
        abbrev in "[A-Z]{1,3}",
    ) {
        let identity = ProjectWorkspaceIdentity::new("TC2602001", name.clone(), abbrev.clone()).unwrap();
        let folder = identity.folder_name();
        prop_assert!(folder.starts_with("TC2602001 - "));
        prop_assert!(folder.contains(abbrev.as_str()));
        // the root folder name must stay a single path segment
        prop_assert!(FolderPath::root().child(folder).is_ok());
    }

    #[test]
    fn prop_taxonomy_levels_only_depend_on_earlier_levels(
        variant in prop_oneof![
            Just(TemplateVariant::Full),
            Just(TemplateVariant::Simplified),
            Just(TemplateVariant::Visit),
        ],
    ) {
        let identity = ProjectWorkspaceIdentity::new("TC2602001", "Projeto Teste", "EMP").unwrap();
        let entries = FolderTaxonomyBuilder::build(&identity, variant);
        let levels = FolderTaxonomyBuilder::group_by_depth(&entries);

        for (depth, paths) in &levels {
            for path in paths {
                prop_assert_eq!(path.depth(), *depth);
                if let Some(parent) = path.parent().filter(|p| !p.is_empty()) {
                    prop_assert!(levels[&(depth - 1)].contains(&parent));
                }
            }
        }
    }
}
