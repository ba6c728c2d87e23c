//! Shared fixtures for tests.

/// A small two-tree regression model in the text format, three features.
///
/// Tree 0: `f0 <= 5` -> (`f2 <= 1.5` ? 1.0 : 2.0), else 3.0.
/// Tree 1: `f1 <= 0.5` -> -0.5, else 0.5.
pub fn sample_model_text() -> String {
    "\
tree
version=v3
num_class=1
num_tree_per_iteration=1
label_index=0
max_feature_idx=2
objective=regression
feature_names=feat_0 feat_1 feat_2
feature_infos=[0:10] [0:10] [0:10]
tree_sizes=400 300

Tree=0
num_leaves=3
num_cat=0
split_feature=0 2
split_gain=10 5
threshold=5 1.5
decision_type=2 0
left_child=1 -1
right_child=-3 -2
leaf_value=1 2 3
leaf_weight=1 1 1
leaf_count=1 1 1
internal_value=0 0
internal_weight=0 0
internal_count=2 2
is_linear=0
shrinkage=1


Tree=1
num_leaves=2
num_cat=0
split_feature=1
split_gain=3
threshold=0.5
decision_type=2
left_child=-1
right_child=-2
leaf_value=-0.5 0.5
leaf_weight=1 1
leaf_count=1 1
internal_value=0
internal_weight=0
internal_count=2
is_linear=0
shrinkage=1


end of trees

feature_importances:
feat_0=1
feat_1=1
feat_2=1

parameters:
[boosting: gbdt]
[objective: regression]
end of parameters
"
    .to_string()
}

/// Reference prediction for `sample_model_text` on one row, raw score space.
pub fn sample_model_score(row: &[f64]) -> f64 {
    let t0 = if row[0].is_nan() || row[0] <= 5.0 {
        if row[2] <= 1.5 {
            1.0
        } else {
            2.0
        }
    } else {
        3.0
    };
    let t1 = if row[1].is_nan() || row[1] <= 0.5 {
        -0.5
    } else {
        0.5
    };
    t0 + t1
}
