//! Artefactos del clasificador: vectorizador TF-IDF y bosque aleatorio.
//!
//! Ambos se cargan desde JSON (los exporta el proceso de entrenamiento) y
//! quedan congelados. El motor sólo los ve a través de los traits
//! [`TextVectorizer`] y [`CategoryClassifier`], de modo que se puede
//! enchufar otro backend sin tocar el motor.

use std::{collections::HashMap, fs, path::Path, sync::LazyLock};

use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Transforma texto libre en un vector numérico de ancho fijo.
pub trait TextVectorizer: Send + Sync {
    fn n_features(&self) -> usize;
    fn transform(&self, text: &str) -> Result<Vec<f64>>;
}

/// Categoría predicha y la probabilidad máxima asociada.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub confidence: f64,
}

/// Clasificador probabilístico sobre un vector de características.
pub trait CategoryClassifier: Send + Sync {
    fn classes(&self) -> &[String];

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>>;

    /// Clase con mayor probabilidad (la primera en caso de empate).
    fn predict(&self, features: &[f64]) -> Result<Prediction> {
        let probabilities = self.predict_proba(features)?;
        let classes = self.classes();
        if probabilities.len() != classes.len() {
            bail!(
                "El clasificador devolvió {} probabilidades para {} clases",
                probabilities.len(),
                classes.len()
            );
        }
        if probabilities.iter().any(|p| !p.is_finite()) {
            bail!("Probabilidades no finitas: {:?}", probabilities);
        }

        let (best, confidence) = probabilities
            .iter()
            .copied()
            .enumerate()
            .fold(None, |acc: Option<(usize, f64)>, (i, p)| match acc {
                Some((_, max)) if p <= max => acc,
                _ => Some((i, p)),
            })
            .ok_or_else(|| anyhow!("El clasificador no tiene clases"))?;

        Ok(Prediction {
            label: classes[best].clone(),
            confidence,
        })
    }
}

// ---------------------------------------------------------------------
// VECTORIZADOR TF-IDF
// ---------------------------------------------------------------------

static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("Patrón de tokens inválido"));

/// Forma del JSON tal y como llega, antes de validar.
#[derive(Deserialize)]
struct RawTfidf {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    #[serde(default = "default_ngram_range")]
    ngram_range: (usize, usize),
}

/// TF-IDF con vocabulario congelado en el entrenamiento.
///
/// Sólo se construye validado: por [`TfidfVectorizer::new`] o al deserializar.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawTfidf")]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    ngram_range: (usize, usize),
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

impl TryFrom<RawTfidf> for TfidfVectorizer {
    type Error = anyhow::Error;

    fn try_from(raw: RawTfidf) -> Result<Self> {
        Self::new(raw.vocabulary, raw.idf, raw.ngram_range)
    }
}

impl TfidfVectorizer {
    pub fn new(vocabulary: HashMap<String, usize>, idf: Vec<f64>, ngram_range: (usize, usize)) -> Result<Self> {
        let vectorizer = Self {
            vocabulary,
            idf,
            ngram_range,
        };
        vectorizer.validate()?;
        Ok(vectorizer)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("JSON del vectorizador inválido")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("No se pudo leer el vectorizador {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("Vectorizador inválido: {}", path.display()))
    }

    fn validate(&self) -> Result<()> {
        let (min_n, max_n) = self.ngram_range;
        if min_n == 0 || min_n > max_n {
            bail!("Rango de n-gramas inválido: ({min_n}, {max_n})");
        }
        if let Some((term, column)) = self.vocabulary.iter().find(|(_, c)| **c >= self.idf.len()) {
            bail!(
                "El término '{term}' apunta a la columna {column} pero sólo hay {} pesos idf",
                self.idf.len()
            );
        }
        Ok(())
    }

    fn ngrams(&self, text: &str) -> Vec<String> {
        let tokens: Vec<&str> = TOKEN_PATTERN.find_iter(text).map(|m| m.as_str()).collect();
        let (min_n, max_n) = self.ngram_range;
        let mut grams = Vec::new();
        for n in min_n.max(1)..=max_n.min(tokens.len()) {
            for window in tokens.windows(n) {
                grams.push(window.join(" "));
            }
        }
        grams
    }
}

impl TextVectorizer for TfidfVectorizer {
    fn n_features(&self) -> usize {
        self.idf.len()
    }

    fn transform(&self, text: &str) -> Result<Vec<f64>> {
        let mut vector = vec![0.0; self.idf.len()];
        for gram in self.ngrams(&text.to_lowercase()) {
            if let Some(&column) = self.vocabulary.get(&gram) {
                let slot = vector
                    .get_mut(column)
                    .ok_or_else(|| anyhow!("'{gram}' apunta a la columna {column} fuera de rango"))?;
                *slot += 1.0;
            }
        }
        for (weight, idf) in vector.iter_mut().zip(&self.idf) {
            *weight *= idf;
        }

        let norm = vector.iter().map(|w| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|w| *w /= norm);
        }
        Ok(vector)
    }
}

// ---------------------------------------------------------------------
// BOSQUE ALEATORIO
// ---------------------------------------------------------------------

const LEAF: i64 = -1;

#[derive(Deserialize)]
struct RawTree {
    children_left: Vec<i64>,
    children_right: Vec<i64>,
    feature: Vec<i64>,
    threshold: Vec<f64>,
    value: Vec<Vec<f64>>,
}

/// Árbol de decisión en forma de arrays paralelos (uno por nodo).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawTree")]
pub struct DecisionTree {
    children_left: Vec<i64>,
    children_right: Vec<i64>,
    feature: Vec<i64>,
    threshold: Vec<f64>,
    /// Distribución de clases en cada nodo.
    value: Vec<Vec<f64>>,
}

impl TryFrom<RawTree> for DecisionTree {
    type Error = anyhow::Error;

    fn try_from(raw: RawTree) -> Result<Self> {
        Self::new(raw.children_left, raw.children_right, raw.feature, raw.threshold, raw.value)
    }
}

impl DecisionTree {
    pub fn new(
        children_left: Vec<i64>,
        children_right: Vec<i64>,
        feature: Vec<i64>,
        threshold: Vec<f64>,
        value: Vec<Vec<f64>>,
    ) -> Result<Self> {
        let tree = Self {
            children_left,
            children_right,
            feature,
            threshold,
            value,
        };
        tree.validate_shape()?;
        Ok(tree)
    }

    fn node_count(&self) -> usize {
        self.children_left.len()
    }

    fn validate_shape(&self) -> Result<()> {
        let n = self.node_count();
        if n == 0 {
            bail!("Árbol sin nodos");
        }
        if [self.children_right.len(), self.feature.len(), self.threshold.len(), self.value.len()]
            .iter()
            .any(|len| *len != n)
        {
            bail!("Los arrays del árbol no tienen la misma longitud ({n} nodos)");
        }
        Ok(())
    }

    fn validate_leaves(&self, n_classes: usize) -> Result<()> {
        for (node, left) in self.children_left.iter().enumerate() {
            let width = self.value.get(node).map_or(0, Vec::len);
            if *left == LEAF && width != n_classes {
                bail!("La hoja {node} tiene {width} valores y hay {n_classes} clases");
            }
        }
        Ok(())
    }

    /// Distribución normalizada de la hoja a la que cae `features`.
    fn leaf_distribution(&self, features: &[f64]) -> Result<Vec<f64>> {
        let mut node = 0usize;
        // Un árbol válido nunca necesita más pasos que nodos.
        for _ in 0..=self.node_count() {
            let left = *self
                .children_left
                .get(node)
                .ok_or_else(|| anyhow!("Nodo {node} fuera de rango"))?;
            if left == LEAF {
                let value = self
                    .value
                    .get(node)
                    .ok_or_else(|| anyhow!("La hoja {node} no tiene distribución"))?;
                let total: f64 = value.iter().sum();
                let normalizer = if total > 0.0 { total } else { 1.0 };
                return Ok(value.iter().map(|v| v / normalizer).collect());
            }

            let feature_index = *self
                .feature
                .get(node)
                .ok_or_else(|| anyhow!("Nodo {node} sin característica"))?;
            let threshold = *self
                .threshold
                .get(node)
                .ok_or_else(|| anyhow!("Nodo {node} sin umbral"))?;
            let right = *self
                .children_right
                .get(node)
                .ok_or_else(|| anyhow!("Nodo {node} sin hijo derecho"))?;
            let feature = usize::try_from(feature_index)
                .ok()
                .and_then(|f| features.get(f))
                .ok_or_else(|| anyhow!("Nodo {node}: característica {feature_index} fuera de rango"))?;

            // Los árboles se entrenan sobre float32: se compara con esa precisión.
            let next = if f64::from(*feature as f32) <= threshold { left } else { right };
            node = usize::try_from(next)
                .ok()
                .filter(|n| *n < self.node_count())
                .ok_or_else(|| anyhow!("Nodo {node}: hijo {next} fuera de rango"))?;
        }
        bail!("El recorrido del árbol no terminó en una hoja")
    }
}

#[derive(Deserialize)]
struct RawForest {
    classes: Vec<String>,
    n_features: usize,
    trees: Vec<DecisionTree>,
}

/// Bosque de árboles de decisión; la probabilidad es la media de las hojas.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawForest")]
pub struct RandomForest {
    classes: Vec<String>,
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl TryFrom<RawForest> for RandomForest {
    type Error = anyhow::Error;

    fn try_from(raw: RawForest) -> Result<Self> {
        Self::new(raw.classes, raw.n_features, raw.trees)
    }
}

impl RandomForest {
    pub fn new(classes: Vec<String>, n_features: usize, trees: Vec<DecisionTree>) -> Result<Self> {
        let forest = Self {
            classes,
            n_features,
            trees,
        };
        forest.validate()?;
        Ok(forest)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("JSON del clasificador inválido")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("No se pudo leer el clasificador {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("Clasificador inválido: {}", path.display()))
    }

    fn validate(&self) -> Result<()> {
        if self.classes.is_empty() {
            bail!("El clasificador no declara clases");
        }
        if self.trees.is_empty() {
            bail!("El clasificador no contiene árboles");
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate_leaves(self.classes.len())
                .with_context(|| format!("Árbol {i} inválido"))?;
        }
        Ok(())
    }
}

impl CategoryClassifier for RandomForest {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>> {
        if features.len() != self.n_features {
            bail!(
                "Se esperaban {} características y llegaron {}",
                self.n_features,
                features.len()
            );
        }

        let mut probabilities = vec![0.0; self.classes.len()];
        for (i, tree) in self.trees.iter().enumerate() {
            let distribution = tree.leaf_distribution(features)?;
            if distribution.len() != probabilities.len() {
                bail!(
                    "Árbol {i}: la hoja tiene {} valores y hay {} clases",
                    distribution.len(),
                    probabilities.len()
                );
            }
            for (acc, p) in probabilities.iter_mut().zip(distribution) {
                *acc += p;
            }
        }
        let n_trees = self.trees.len() as f64;
        probabilities.iter_mut().for_each(|p| *p /= n_trees);
        Ok(probabilities)
    }
}
