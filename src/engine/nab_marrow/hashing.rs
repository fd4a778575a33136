use std::collections::HashMap;
use std::hash::BuildHasherDefault;
use metrohash::MetroHash64;

pub type MetroHashMap<K, V> = HashMap<K, V, BuildHasherDefault<MetroHash64>>;
